use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use dg_core::{
    Article, ArticleInsight, CompletionRequest, Confidence, ExtractInsights, LanguageModel, PromptPurpose,
    Result,
};
use crate::json::parse_model_json;
use crate::prompts;

fn trimmed_strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn trimmed_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build an insight record from the model's JSON, or `None` when it holds no usable bullet.
pub fn insight_from_reply(article_id: &str, reply: &Value) -> Option<ArticleInsight> {
    let insights = trimmed_strings(&reply["insights"]);
    if insights.is_empty() {
        return None;
    }

    let categories = reply["categories"].is_array().then(|| trimmed_strings(&reply["categories"]));
    let confidence = reply["confidence"]
        .as_str()
        .and_then(|c| c.parse::<Confidence>().ok());

    Some(ArticleInsight {
        article_id: article_id.to_string(),
        insights,
        categories,
        confidence,
        rationale: trimmed_str(&reply["rationale"]),
    })
}

pub struct InsightExtractor {
    model: Arc<dyn LanguageModel>,
}

impl InsightExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ExtractInsights for InsightExtractor {
    async fn extract_insights(&self, article: &Article) -> Result<Option<ArticleInsight>> {
        let Some(text) = article.analyzable_text() else {
            warn!("⚠️ '{}' has insufficient text for insights", article.title);
            return Ok(None);
        };

        info!("💡 Extracting insights: {}", article.title);
        let request = CompletionRequest::new(
            PromptPurpose::Insights,
            prompts::insights(&article.title, &article.source, text),
        )
        .with_system(prompts::INSIGHTS_SYSTEM)
        .with_temperature(0.2)
        .with_max_tokens(300);

        let raw = self.model.complete(&request).await?;
        let reply: Value = parse_model_json(&raw)?;

        let insight = insight_from_reply(&article.id, &reply);
        if insight.is_none() {
            info!("🤷 No usable insights for '{}'", article.title);
        }
        Ok(insight)
    }
}
