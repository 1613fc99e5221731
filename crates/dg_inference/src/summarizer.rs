use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use dg_core::{
    Article, ArticleSummary, CompletionRequest, Confidence, Error, LanguageModel, PromptPurpose, Result,
    Sentiment, Summarize,
};
use crate::json::parse_model_json;
use crate::prompts;
use crate::splitter::TextChunker;

/// Below this many characters the article goes to the model in one request.
pub const FAST_PATH_LIMIT: usize = 3_000;
/// Below this, try one request first and only chunk if it fails.
pub const DIRECT_LIMIT: usize = 50_000;
/// Returned as the summary text when every chunk failed.
pub const FAILED_SUMMARY: &str = "Failed to generate summary due to processing errors.";

#[derive(Debug, Deserialize)]
struct SentimentReply {
    sentiment: Option<String>,
    confidence: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentVerdict {
    pub sentiment: Sentiment,
    pub confidence: Confidence,
    pub reason: Option<String>,
}

impl SentimentVerdict {
    /// Used when the sentiment call itself fails.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: Confidence::Low,
            reason: None,
        }
    }

    fn from_reply(reply: SentimentReply) -> Self {
        Self {
            sentiment: reply
                .sentiment
                .and_then(|s| s.parse().ok())
                .unwrap_or(Sentiment::Neutral),
            confidence: reply
                .confidence
                .and_then(|c| c.parse().ok())
                .unwrap_or(Confidence::Medium),
            reason: reply.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        }
    }
}

/// Trim model chatter around a one-sentence summary.
fn tidy_summary(raw: &str) -> String {
    let mut text = raw.trim();
    if text.get(..8).is_some_and(|label| label.eq_ignore_ascii_case("summary:")) {
        text = text[8..].trim_start();
    }
    let text = text.trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}');
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    splitter: TextChunker,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            splitter: TextChunker::default(),
        }
    }

    pub fn with_splitter(mut self, splitter: TextChunker) -> Self {
        self.splitter = splitter;
        self
    }

    async fn summarize_once(&self, text: &str) -> Result<String> {
        let request = CompletionRequest::new(PromptPurpose::Summary, prompts::summary(text))
            .with_temperature(0.1)
            .with_max_tokens(200);
        let summary = tidy_summary(&self.model.complete(&request).await?);
        if summary.is_empty() {
            return Err(Error::Inference("Model returned an empty summary".to_string()));
        }
        Ok(summary)
    }

    /// Only chunk when the text is too long for a single request.
    async fn summarize_text(&self, text: &str) -> Result<String> {
        let length = text.chars().count();
        if length < FAST_PATH_LIMIT {
            debug!("🚀 Fast path: {} chars in one request", length);
            return self.summarize_once(text).await;
        }
        if length < DIRECT_LIMIT {
            debug!("⚡ Moderate length: trying {} chars in one request", length);
            return match self.summarize_once(text).await {
                Ok(summary) => Ok(summary),
                Err(e) => {
                    warn!("⚠️ Direct summary failed, falling back to chunking: {}", e);
                    Ok(self.chunk_and_summarize(text).await)
                }
            };
        }
        info!("📚 Long text: chunking {} chars", length);
        Ok(self.chunk_and_summarize(text).await)
    }

    /// Summarize every chunk, then merge. Never fails: falls back to the sentinel text.
    async fn chunk_and_summarize(&self, text: &str) -> String {
        let chunks = self.splitter.split_text(text);
        let total = chunks.len();
        let mut chunk_summaries = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            match self.summarize_once(chunk).await {
                Ok(summary) => {
                    debug!("✅ Chunk {}/{} summarized", i + 1, total);
                    chunk_summaries.push(summary);
                }
                Err(e) => warn!("⚠️ Failed to summarize chunk {}/{}: {}", i + 1, total, e),
            }
        }

        match chunk_summaries.len() {
            0 => FAILED_SUMMARY.to_string(),
            1 => chunk_summaries.remove(0),
            _ => {
                let request = CompletionRequest::new(
                    PromptPurpose::CombineSummaries,
                    prompts::combine_summaries(&chunk_summaries),
                )
                .with_max_tokens(200);
                match self.model.complete(&request).await.map(|s| tidy_summary(&s)) {
                    Ok(summary) if !summary.is_empty() => summary,
                    Ok(_) => chunk_summaries.remove(0),
                    Err(e) => {
                        warn!("⚠️ Failed to combine chunk summaries: {}", e);
                        chunk_summaries.remove(0)
                    }
                }
            }
        }
    }

    /// Sentiment of the generated summary, not of the original article.
    pub async fn analyze_sentiment(&self, summary: &str) -> SentimentVerdict {
        let request = CompletionRequest::new(PromptPurpose::Sentiment, prompts::sentiment(summary))
            .with_max_tokens(100);
        let reply = match self.model.complete(&request).await {
            Ok(raw) => parse_model_json::<SentimentReply>(&raw),
            Err(e) => Err(e),
        };
        match reply {
            Ok(reply) => SentimentVerdict::from_reply(reply),
            Err(e) => {
                warn!("⚠️ Sentiment analysis failed, defaulting to neutral: {}", e);
                SentimentVerdict::fallback()
            }
        }
    }
}

#[async_trait]
impl Summarize for Summarizer {
    async fn summarize(&self, article: &Article) -> Result<Option<ArticleSummary>> {
        let Some(text) = article.analyzable_text() else {
            warn!("⚠️ '{}' has insufficient text for summarization", article.title);
            return Ok(None);
        };

        info!("📝 Summarizing: {}", article.title);
        let summary = self.summarize_text(text).await?;
        let verdict = self.analyze_sentiment(&summary).await;

        Ok(Some(ArticleSummary {
            article_id: article.id.clone(),
            summary,
            sentiment: verdict.sentiment,
            sentiment_confidence: Some(verdict.confidence),
            sentiment_reason: verdict.reason,
        }))
    }
}
