use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum trimmed length of `raw_text` for an article to be analyzed.
pub const MIN_TEXT_LEN: usize = 50;

pub const MIN_ARTICLES: usize = 1;
pub const MAX_ARTICLES: usize = 20;
pub const DEFAULT_ARTICLES: usize = 5;
pub const DEFAULT_QUERY: &str = "AI Trends articles";

/// One fetched source document. Created once by the fetcher, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_date: Option<String>,
    pub raw_text: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            url: url.into(),
            source: source.into(),
            published_date: None,
            raw_text: None,
        }
    }

    pub fn with_published_date(mut self, date: Option<String>) -> Self {
        self.published_date = date;
        self
    }

    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }

    /// Trimmed text, if long enough to be worth a model call.
    pub fn analyzable_text(&self) -> Option<&str> {
        self.raw_text
            .as_deref()
            .map(str::trim)
            .filter(|text| text.chars().count() >= MIN_TEXT_LEN)
    }

    pub fn has_analyzable_text(&self) -> bool {
        self.analyzable_text().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Mixed => "mixed",
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "mixed" => Ok(Sentiment::Mixed),
            other => Err(format!("Unknown sentiment: {}", other)),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            other => Err(format!("Unknown confidence: {}", other)),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-sentence summary of a single article, with sentiment derived from the summary text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article_id: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub sentiment_confidence: Option<Confidence>,
    pub sentiment_reason: Option<String>,
}

/// Actionable bullets extracted from the full text of one article.
/// Never built with an empty `insights` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInsight {
    pub article_id: String,
    pub insights: Vec<String>,
    pub categories: Option<Vec<String>>,
    pub confidence: Option<Confidence>,
    pub rationale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_ids_are_unique() {
        let a = Article::new("One", "https://example.com/1", "Example");
        let b = Article::new("One", "https://example.com/1", "Example");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_analyzable_text() {
        let article = Article::new("Short", "https://example.com", "Example");
        assert!(!article.has_analyzable_text());

        let article = article.with_raw_text("ten chars!");
        assert!(!article.has_analyzable_text());

        let padded = format!("   {}   ", "x".repeat(MIN_TEXT_LEN - 1));
        let article = Article::new("Padded", "https://example.com", "Example").with_raw_text(padded);
        assert!(!article.has_analyzable_text());

        let article = Article::new("Long", "https://example.com", "Example")
            .with_raw_text("x".repeat(MIN_TEXT_LEN));
        assert_eq!(article.analyzable_text().map(str::len), Some(MIN_TEXT_LEN));
    }

    #[test]
    fn test_sentiment_parsing() {
        assert_eq!("Positive".parse::<Sentiment>(), Ok(Sentiment::Positive));
        assert_eq!(" mixed ".parse::<Sentiment>(), Ok(Sentiment::Mixed));
        assert!("angry".parse::<Sentiment>().is_err());
        assert_eq!("HIGH".parse::<Confidence>(), Ok(Confidence::High));
        assert!("certain".parse::<Confidence>().is_err());
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        let summary = ArticleSummary {
            article_id: "a1".to_string(),
            summary: "Something happened.".to_string(),
            sentiment: Sentiment::Negative,
            sentiment_confidence: Some(Confidence::Low),
            sentiment_reason: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["sentiment"], "negative");
        assert_eq!(json["sentiment_confidence"], "low");
    }
}
