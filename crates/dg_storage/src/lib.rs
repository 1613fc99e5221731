use std::sync::Arc;
use dg_core::config::{CalendarBackend, UploadBackend};
use dg_core::{CalendarNotifier, DigestConfig, ReportStore, Result};

pub mod backends;
pub mod calendar;
pub mod oauth;

pub use backends::*;
pub use calendar::GoogleCalendar;
pub use oauth::GoogleAuth;

/// The configured upload backend, or `None` when uploads are disabled.
pub fn create_store(config: &DigestConfig) -> Result<Option<Arc<dyn ReportStore>>> {
    let store: Arc<dyn ReportStore> = match config.upload {
        UploadBackend::Drive => Arc::new(DriveStorage::new(
            Arc::new(GoogleAuth::from_config(config)?),
            config.drive_folder_id.clone(),
        )),
        UploadBackend::Local => Arc::new(LocalStorage::new(&config.share_dir)),
        UploadBackend::Disabled => return Ok(None),
    };
    Ok(Some(store))
}

/// The configured calendar, or `None` when notifications are disabled.
pub fn create_calendar(config: &DigestConfig) -> Result<Option<Arc<dyn CalendarNotifier>>> {
    match config.calendar {
        CalendarBackend::Google => Ok(Some(Arc::new(GoogleCalendar::new(
            Arc::new(GoogleAuth::from_config(config)?),
            config.calendar_id.clone(),
        )))),
        CalendarBackend::Disabled => Ok(None),
    }
}

pub mod prelude {
    pub use super::{create_calendar, create_store, DriveStorage, GoogleCalendar, LocalStorage};
    pub use dg_core::{CalendarNotifier, ReportStore, Result};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_follow_config() {
        let config = DigestConfig::default();
        assert_eq!(create_store(&config).unwrap().unwrap().name(), "Google Drive");
        assert_eq!(create_calendar(&config).unwrap().unwrap().name(), "Google Calendar");

        let config = DigestConfig {
            upload: UploadBackend::Local,
            calendar: CalendarBackend::Disabled,
            ..DigestConfig::default()
        };
        assert_eq!(create_store(&config).unwrap().unwrap().name(), "Local share");
        assert!(create_calendar(&config).unwrap().is_none());

        let config = DigestConfig {
            upload: UploadBackend::Disabled,
            ..DigestConfig::default()
        };
        assert!(create_store(&config).unwrap().is_none());
    }
}
