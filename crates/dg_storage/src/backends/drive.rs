use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use dg_core::{Error, ReportStore, Result};
use crate::oauth::GoogleAuth;

pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    web_view_link: Option<String>,
}

/// `multipart/related` body: JSON metadata part followed by the PDF bytes.
pub fn multipart_body(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Uploads reports to Google Drive with the `drive.file` scope.
#[derive(Debug)]
pub struct DriveStorage {
    auth: Arc<GoogleAuth>,
    folder_id: Option<String>,
    upload_url: String,
}

impl DriveStorage {
    pub fn new(auth: Arc<GoogleAuth>, folder_id: Option<String>) -> Self {
        Self {
            auth,
            folder_id,
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        }
    }

    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }

    fn metadata(&self, name: &str) -> serde_json::Value {
        let mut metadata = json!({ "name": name, "mimeType": "application/pdf" });
        if let Some(folder) = &self.folder_id {
            metadata["parents"] = json!([folder]);
        }
        metadata
    }
}

#[async_trait]
impl ReportStore for DriveStorage {
    fn name(&self) -> &str {
        "Google Drive"
    }

    async fn upload_report(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::Storage(format!("Report file not found: {}", path.display())));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Storage(format!("Report path has no file name: {}", path.display())))?;

        let content = tokio::fs::read(path).await?;
        let token = self.auth.access_token().await?;
        let boundary = format!("digest-{}", uuid::Uuid::new_v4().simple());

        let file = self
            .auth
            .client()
            .post(&self.upload_url)
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(multipart_body(&boundary, &self.metadata(name), &content))
            .send()
            .await?
            .error_for_status()?
            .json::<DriveFile>()
            .await?;

        info!(
            "✅ Uploaded to Drive. File ID: {}, Link: {}",
            file.id,
            file.web_view_link.as_deref().unwrap_or("n/a")
        );
        Ok(file.id)
    }
}
