use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing credentials or unusable settings. Fatal: no run is attempted.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad input at the pipeline boundary, rejected before any stage runs.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Configuration errors are the only ones allowed to abort a run.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::Configuration("SERPAPI_API_KEY not set".to_string()).is_configuration());
        assert!(!Error::Scraping("timeout".to_string()).is_configuration());
        assert!(Error::Validation("bad count".to_string()).is_validation());
        assert!(!Error::Report("disk full".to_string()).is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Configuration("GROQ_API_KEY not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: GROQ_API_KEY not set");
    }
}
