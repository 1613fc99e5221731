use async_trait::async_trait;
use std::fmt;
use crate::types::{Article, ArticleInsight, ArticleSummary};
use crate::Result;

/// What a completion is for. Remote models ignore it; offline models use it to pick a canned shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPurpose {
    Summary,
    CombineSummaries,
    Sentiment,
    Insights,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: PromptPurpose,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(purpose: PromptPurpose, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            system: None,
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 200,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run a single completion and return the raw text answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Text -> one-sentence summary + sentiment.
///
/// `Ok(None)` means the article was rejected (no usable text). `Err` is a per-item failure.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, article: &Article) -> Result<Option<ArticleSummary>>;
}

/// Text -> actionable bullets.
///
/// `Ok(None)` covers both "no usable text" and "the model found nothing worth a bullet".
#[async_trait]
pub trait ExtractInsights: Send + Sync {
    async fn extract_insights(&self, article: &Article) -> Result<Option<ArticleInsight>>;
}
