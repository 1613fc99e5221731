use async_trait::async_trait;
use std::fmt;
use dg_core::{CompletionRequest, LanguageModel, PromptPurpose, Result};
use crate::prompts;

/// Deterministic offline model. Lets the whole pipeline run without network access.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

fn sentences(text: &str) -> Vec<String> {
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .map(|s| format!("{}.", s))
        .collect()
}

#[async_trait]
impl LanguageModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let text = prompts::unfence(&request.prompt).unwrap_or(&request.prompt);

        let reply = match request.purpose {
            PromptPurpose::Summary | PromptPurpose::CombineSummaries => {
                sentences(text).into_iter().next().unwrap_or_default()
            }
            PromptPurpose::Sentiment => serde_json::json!({
                "sentiment": "neutral",
                "confidence": "medium",
                "reason": "The offline model does not score sentiment."
            })
            .to_string(),
            PromptPurpose::Insights => serde_json::json!({
                "insights": sentences(text).into_iter().take(3).collect::<Vec<_>>(),
                "categories": ["general"],
                "confidence": "low",
                "rationale": "Leading sentences of the article."
            })
            .to_string(),
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        let text = "This is a test article. It has multiple sentences! This is the third sentence? And a fourth.";

        let summary = model
            .complete(&CompletionRequest::new(PromptPurpose::Summary, prompts::summary(text)))
            .await
            .unwrap();
        assert_eq!(summary, "This is a test article.");

        let sentiment = model
            .complete(&CompletionRequest::new(PromptPurpose::Sentiment, prompts::sentiment(&summary)))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&sentiment).unwrap();
        assert_eq!(value["sentiment"], "neutral");

        let insights = model
            .complete(&CompletionRequest::new(PromptPurpose::Insights, prompts::insights("T", "S", text)))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&insights).unwrap();
        assert_eq!(value["insights"].as_array().unwrap().len(), 3);
        assert_eq!(value["insights"][1], "It has multiple sentences.");
    }
}
