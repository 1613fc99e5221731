use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::{Error, Result};

pub const DEFAULT_MODEL_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL_NAME: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_REPORTS_DIR: &str = "data/reports";
pub const DEFAULT_SHARE_DIR: &str = "data/shared";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Groq,
    Dummy,
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" | "openai" => Ok(ModelKind::Groq),
            "dummy" => Ok(ModelKind::Dummy),
            other => Err(Error::Configuration(format!(
                "Unknown model '{}'. Available models: groq (default), dummy",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBackend {
    Drive,
    Local,
    Disabled,
}

impl FromStr for UploadBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "drive" => Ok(UploadBackend::Drive),
            "local" => Ok(UploadBackend::Local),
            "none" | "off" | "" => Ok(UploadBackend::Disabled),
            other => Err(Error::Configuration(format!(
                "Unknown upload backend '{}'. Expected drive, local or none",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarBackend {
    Google,
    Disabled,
}

impl FromStr for CalendarBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(CalendarBackend::Google),
            "none" | "off" | "" => Ok(CalendarBackend::Disabled),
            other => Err(Error::Configuration(format!(
                "Unknown calendar backend '{}'. Expected google or none",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DigestConfig {
    pub serpapi_key: Option<String>,
    pub model: ModelKind,
    pub model_api_key: Option<String>,
    pub model_name: String,
    pub model_url: String,
    pub google_credentials_path: PathBuf,
    pub google_token_path: PathBuf,
    pub drive_folder_id: Option<String>,
    pub calendar_id: Option<String>,
    pub upload: UploadBackend,
    pub share_dir: PathBuf,
    pub calendar: CalendarBackend,
    pub reports_dir: PathBuf,
    /// `None` disables the run-level timeout.
    pub run_timeout: Option<Duration>,
    pub concurrency: usize,
}

impl std::fmt::Debug for DigestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestConfig")
            .field("serpapi_key", &self.serpapi_key.as_deref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("model_api_key", &self.model_api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("model_url", &self.model_url)
            .field("google_credentials_path", &self.google_credentials_path)
            .field("google_token_path", &self.google_token_path)
            .field("drive_folder_id", &self.drive_folder_id)
            .field("calendar_id", &self.calendar_id)
            .field("upload", &self.upload)
            .field("share_dir", &self.share_dir)
            .field("calendar", &self.calendar)
            .field("reports_dir", &self.reports_dir)
            .field("run_timeout", &self.run_timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            model: ModelKind::Groq,
            model_api_key: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            google_credentials_path: PathBuf::from("credentials.json"),
            google_token_path: PathBuf::from("token.json"),
            drive_folder_id: None,
            calendar_id: None,
            upload: UploadBackend::Drive,
            share_dir: PathBuf::from(DEFAULT_SHARE_DIR),
            calendar: CalendarBackend::Google,
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            run_timeout: Some(Duration::from_secs(600)),
            concurrency: 4,
        }
    }
}

impl DigestConfig {
    /// Load from the process environment, reading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let model = match get("DIGEST_MODEL") {
            Some(value) => value.parse()?,
            None => defaults.model,
        };
        let upload = match get("DIGEST_UPLOAD") {
            Some(value) => value.parse()?,
            None => defaults.upload,
        };
        let calendar = match get("DIGEST_CALENDAR") {
            Some(value) => value.parse()?,
            None => defaults.calendar,
        };
        let run_timeout = match get("DIGEST_RUN_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| {
                    Error::Configuration(format!("DIGEST_RUN_TIMEOUT_SECS must be a number, got '{}'", value))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.run_timeout,
        };
        let concurrency = match get("DIGEST_CONCURRENCY") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::Configuration(format!("DIGEST_CONCURRENCY must be a positive number, got '{}'", value))
                })?,
            None => defaults.concurrency,
        };

        Ok(Self {
            serpapi_key: get("SERPAPI_API_KEY"),
            model,
            model_api_key: get("GROQ_API_KEY"),
            model_name: get("DIGEST_MODEL_NAME").unwrap_or(defaults.model_name),
            model_url: get("DIGEST_MODEL_URL").unwrap_or(defaults.model_url),
            google_credentials_path: get("GOOGLE_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.google_credentials_path),
            google_token_path: get("GOOGLE_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.google_token_path),
            drive_folder_id: get("GOOGLE_DRIVE_FOLDER_ID"),
            calendar_id: get("GOOGLE_CALENDAR_ID"),
            upload,
            share_dir: get("DIGEST_SHARE_DIR").map(PathBuf::from).unwrap_or(defaults.share_dir),
            calendar,
            reports_dir: get("DIGEST_REPORTS_DIR").map(PathBuf::from).unwrap_or(defaults.reports_dir),
            run_timeout,
            concurrency,
        })
    }
}
