use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::Path;
use crate::Result;

#[async_trait]
pub trait ReportStore: Send + Sync {
    fn name(&self) -> &str;

    /// Upload a rendered report and return the identifier assigned by the backend.
    async fn upload_report(&self, path: &Path) -> Result<String>;
}

#[async_trait]
pub trait CalendarNotifier: Send + Sync {
    fn name(&self) -> &str;

    /// Create an event announcing a finished report and return its id.
    async fn create_report_event(
        &self,
        report_name: &str,
        generated_at: DateTime<Local>,
        drive_file_id: Option<&str>,
    ) -> Result<String>;
}
