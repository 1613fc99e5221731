pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod report;
pub mod storage;
pub mod types;

pub use config::{CalendarBackend, DigestConfig, ModelKind, UploadBackend};
pub use error::{Error, Result};
pub use fetch::ArticleFetcher;
pub use models::{CompletionRequest, ExtractInsights, LanguageModel, PromptPurpose, Summarize};
pub use report::{ReportInput, ReportRenderer};
pub use storage::{CalendarNotifier, ReportStore};
pub use types::{Article, ArticleInsight, ArticleSummary, Confidence, Sentiment};
