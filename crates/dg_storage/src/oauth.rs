//! Google OAuth for an already-authorized user: reads `token.json`, refreshes it when expired
//! and writes the refreshed token back. There is no interactive consent flow.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use dg_core::{DigestConfig, Error, Result};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens within this window of their expiry are refreshed early.
const EXPIRY_SKEW_SECS: i64 = 60;

/// The authorized-user file written by Google's client libraries.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(alias = "access_token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl AuthorizedUser {
    /// Accepts RFC 3339 and the zone-less ISO form, read as UTC.
    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.token.as_deref().map_or(true, str::is_empty) {
            return false;
        }
        match self.expiry_time() {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClientSecret {
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
}

/// `credentials.json` nests the client under `installed` or `web`.
#[derive(Debug, Default, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

pub struct GoogleAuth {
    client: Client,
    token_path: PathBuf,
    credentials_path: PathBuf,
    cached: Mutex<Option<AuthorizedUser>>,
}

impl fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleAuth")
            .field("token_path", &self.token_path)
            .field("credentials_path", &self.credentials_path)
            .finish()
    }
}

impl GoogleAuth {
    /// Nothing is read until the first token is requested.
    pub fn new(token_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(std::time::Duration::from_secs(30)).build()?,
            token_path: token_path.into(),
            credentials_path: credentials_path.into(),
            cached: Mutex::new(None),
        })
    }

    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        Self::new(&config.google_token_path, &config.google_credentials_path)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// A bearer token that is valid right now.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let user = match cached.take() {
            Some(user) => user,
            None => self.load().await?,
        };

        let user = if user.is_valid(Utc::now()) {
            user
        } else {
            let refreshed = self.refresh(user).await?;
            self.save(&refreshed).await?;
            refreshed
        };

        let token = user.token.clone().unwrap_or_default();
        *cached = Some(user);
        Ok(token)
    }

    async fn load(&self) -> Result<AuthorizedUser> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Configuration(format!(
                    "Google OAuth token not found at {}. Authorize this app once and save the token file there.",
                    self.token_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        debug!("🔑 Loaded Google token from {}", self.token_path.display());
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, user: &AuthorizedUser) -> Result<()> {
        tokio::fs::write(&self.token_path, serde_json::to_string_pretty(user)?).await?;
        Ok(())
    }

    async fn client_secret(&self) -> Result<ClientSecret> {
        read_client_secret(&self.credentials_path).await
    }

    async fn refresh(&self, mut user: AuthorizedUser) -> Result<AuthorizedUser> {
        let refresh_token = user.refresh_token.clone().ok_or_else(|| {
            Error::Configuration(format!(
                "Google token at {} is expired and has no refresh token",
                self.token_path.display()
            ))
        })?;

        if user.client_id.is_none() || user.client_secret.is_none() {
            let secret = self.client_secret().await?;
            user.client_id = user.client_id.or(secret.client_id);
            user.client_secret = user.client_secret.or(secret.client_secret);
            user.token_uri = user.token_uri.or(secret.token_uri);
        }
        let (Some(client_id), Some(client_secret)) = (user.client_id.clone(), user.client_secret.clone()) else {
            return Err(Error::Configuration(
                "Google OAuth client id/secret missing from both token and credentials files".to_string(),
            ));
        };
        let token_uri = user.token_uri.clone().unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        info!("🔄 Refreshing Google access token");
        let response = self
            .client
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<RefreshResponse>()
            .await?;

        user.token = Some(response.access_token);
        user.expiry = response
            .expires_in
            .map(|secs| (Utc::now() + Duration::seconds(secs)).to_rfc3339());
        Ok(user)
    }
}

async fn read_client_secret(path: &Path) -> Result<ClientSecret> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Configuration(format!(
                "Google OAuth client secrets not found at {}.",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let file: ClientSecretsFile = serde_json::from_str(&raw)?;
    file.installed
        .or(file.web)
        .ok_or_else(|| Error::Configuration(format!("{} has no installed or web client", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(token: Option<&str>, expiry: Option<&str>) -> AuthorizedUser {
        AuthorizedUser {
            token: token.map(str::to_string),
            expiry: expiry.map(str::to_string),
            ..AuthorizedUser::default()
        }
    }

    #[test]
    fn test_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(user(None, Some("2024-03-01T09:30:00Z")).expiry_time(), Some(expected));
        assert_eq!(user(None, Some("2024-03-01T09:30:00.000000")).expiry_time(), Some(expected));
        assert_eq!(user(None, Some("tomorrow")).expiry_time(), None);
    }

    #[test]
    fn test_validity() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert!(user(Some("t"), Some("2024-03-01T10:00:00Z")).is_valid(now));
        assert!(!user(Some("t"), Some("2024-03-01T09:00:30Z")).is_valid(now));
        assert!(user(Some("t"), None).is_valid(now));
        assert!(!user(None, None).is_valid(now));
    }

    #[test]
    fn test_token_file_round_trip_keeps_unknown_fields() {
        let raw = r#"{"access_token": "abc", "scopes": ["drive.file"], "universe_domain": "googleapis.com"}"#;
        let parsed: AuthorizedUser = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("abc"));

        let written = serde_json::to_value(&parsed).unwrap();
        assert_eq!(written["token"], "abc");
        assert_eq!(written["scopes"][0], "drive.file");
        assert!(!format!("{:?}", parsed).contains("abc"));
    }

    #[tokio::test]
    async fn test_missing_token_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let auth = GoogleAuth::new(dir.path().join("token.json"), dir.path().join("credentials.json")).unwrap();
        let err = auth.access_token().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_valid_token_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        std::fs::write(&token_path, r#"{"token": "live-token", "expiry": "2999-01-01T00:00:00Z"}"#).unwrap();

        let auth = GoogleAuth::new(&token_path, dir.path().join("credentials.json")).unwrap();
        assert_eq!(auth.access_token().await.unwrap(), "live-token");
        assert_eq!(auth.access_token().await.unwrap(), "live-token");
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        std::fs::write(&token_path, r#"{"token": "old", "expiry": "2000-01-01T00:00:00Z"}"#).unwrap();

        let auth = GoogleAuth::new(&token_path, dir.path().join("credentials.json")).unwrap();
        assert!(auth.access_token().await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_client_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"installed": {"client_id": "id", "client_secret": "s"}}"#).unwrap();
        let secret = read_client_secret(&path).await.unwrap();
        assert_eq!(secret.client_id.as_deref(), Some("id"));

        std::fs::write(&path, r#"{"other": {}}"#).unwrap();
        assert!(read_client_secret(&path).await.unwrap_err().is_configuration());
    }
}
