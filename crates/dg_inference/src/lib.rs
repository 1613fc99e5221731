use std::sync::Arc;
use dg_core::{DigestConfig, Result};

pub mod insights;
pub mod json;
pub mod models;
pub mod prompts;
pub mod splitter;
pub mod summarizer;

pub use insights::InsightExtractor;
pub use models::create_model;
pub use splitter::TextChunker;
pub use summarizer::{Summarizer, FAILED_SUMMARY};

/// Both analysis services, sharing one model client.
pub fn create_analyzers(config: &DigestConfig) -> Result<(Summarizer, InsightExtractor)> {
    let model = create_model(config)?;
    Ok((Summarizer::new(Arc::clone(&model)), InsightExtractor::new(model)))
}

pub mod prelude {
    pub use super::{create_analyzers, create_model, InsightExtractor, Summarizer};
    pub use dg_core::{Article, ArticleInsight, ArticleSummary, Error, LanguageModel, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::config::ModelKind;
    use dg_core::{Article, ExtractInsights, Sentiment, Summarize};

    #[tokio::test]
    async fn test_offline_analyzers() {
        let config = DigestConfig {
            model: ModelKind::Dummy,
            ..DigestConfig::default()
        };
        let (summarizer, extractor) = create_analyzers(&config).unwrap();
        let article = Article::new("Rates", "https://news.example/rates", "Wire").with_raw_text(
            "The central bank held rates steady. Markets had expected a cut. Analysts now look to June.",
        );

        let summary = summarizer.summarize(&article).await.unwrap().unwrap();
        assert_eq!(summary.summary, "The central bank held rates steady.");
        assert_eq!(summary.sentiment, Sentiment::Neutral);

        let insight = extractor.extract_insights(&article).await.unwrap().unwrap();
        assert_eq!(insight.insights.len(), 3);
    }
}
