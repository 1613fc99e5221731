use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use dg_core::{Error, ReportStore, Result};

/// "Uploads" by copying into a shared directory. The file name is the id.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    share_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(share_dir: impl Into<PathBuf>) -> Self {
        Self {
            share_dir: share_dir.into(),
        }
    }
}

#[async_trait]
impl ReportStore for LocalStorage {
    fn name(&self) -> &str {
        "Local share"
    }

    async fn upload_report(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(Error::Storage(format!("Report file not found: {}", path.display())));
        }
        let name = path
            .file_name()
            .ok_or_else(|| Error::Storage(format!("Report path has no file name: {}", path.display())))?;

        tokio::fs::create_dir_all(&self.share_dir).await?;
        let target = self.share_dir.join(name);
        tokio::fs::copy(path, &target).await?;
        info!("📁 Report shared at {}", target.display());
        Ok(name.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copies_into_share_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("Digest - 20240301_093005.pdf");
        std::fs::write(&report, b"%PDF-1.3").unwrap();

        let storage = LocalStorage::new(dir.path().join("shared"));
        let id = storage.upload_report(&report).await.unwrap();
        assert_eq!(id, "Digest - 20240301_093005.pdf");
        assert_eq!(std::fs::read(dir.path().join("shared").join(&id)).unwrap(), b"%PDF-1.3");
    }

    #[tokio::test]
    async fn test_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.upload_report(&dir.path().join("gone.pdf")).await.is_err());
    }
}
