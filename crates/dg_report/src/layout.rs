//! Report content as an ordered list of typed blocks. Everything here is pure:
//! the same inputs and timestamp always produce the same blocks.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use dg_core::{ArticleInsight, ArticleSummary, ReportInput};

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Subtitle(String),
    Heading(String),
    Meta(String),
    Section(String),
    Body(String),
    Emphasis(String),
    Bullet(String),
    Spacer(f32),
}

pub const SUMMARY_SECTION: &str = "Summary";
pub const INSIGHTS_SECTION: &str = "Actionable Insights";

pub fn sentiment_line(summary: &ArticleSummary) -> String {
    match summary.sentiment_confidence {
        Some(confidence) => format!("Sentiment: {} (confidence={})", summary.sentiment, confidence),
        None => format!("Sentiment: {}", summary.sentiment),
    }
}

/// First summary per article id.
fn summaries_by_article<'a>(summaries: &'a [ArticleSummary]) -> HashMap<&'a str, &'a ArticleSummary> {
    let mut index = HashMap::new();
    for summary in summaries {
        index.entry(summary.article_id.as_str()).or_insert(summary);
    }
    index
}

/// Every bullet for an article id, flattened across records in their original order.
fn bullets_by_article<'a>(insights: &'a [ArticleInsight]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
    for record in insights {
        index
            .entry(record.article_id.as_str())
            .or_default()
            .extend(record.insights.iter().map(String::as_str));
    }
    index
}

pub fn layout(input: &ReportInput<'_>, generated_at: NaiveDateTime) -> Vec<Block> {
    let summaries = summaries_by_article(input.summaries);
    let bullets = bullets_by_article(input.insights);

    let mut blocks = vec![
        Block::Title(input.title.to_string()),
        Block::Subtitle(format!("Generated on {}", generated_at.format("%Y-%m-%d %H:%M"))),
        Block::Spacer(14.0),
    ];

    for (idx, article) in input.articles.iter().enumerate() {
        blocks.push(Block::Heading(format!("{}. {}", idx + 1, article.title)));
        blocks.push(Block::Meta(format!(
            "Source: {} | Date: {} | URL: {}",
            article.source,
            article.published_date.as_deref().unwrap_or("N/A"),
            article.url
        )));
        blocks.push(Block::Spacer(7.0));

        if let Some(summary) = summaries.get(article.id.as_str()) {
            blocks.push(Block::Section(SUMMARY_SECTION.to_string()));
            blocks.push(Block::Body(summary.summary.clone()));
            blocks.push(Block::Emphasis(sentiment_line(summary)));
        }

        if let Some(items) = bullets.get(article.id.as_str()).filter(|items| !items.is_empty()) {
            blocks.push(Block::Spacer(4.0));
            blocks.push(Block::Section(INSIGHTS_SECTION.to_string()));
            blocks.extend(items.iter().map(|item| Block::Bullet(item.to_string())));
        }

        blocks.push(Block::Spacer(18.0));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dg_core::{Article, Confidence, Sentiment};

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn summary(article: &Article, text: &str) -> ArticleSummary {
        ArticleSummary {
            article_id: article.id.clone(),
            summary: text.to_string(),
            sentiment: Sentiment::Positive,
            sentiment_confidence: Some(Confidence::High),
            sentiment_reason: None,
        }
    }

    fn insight(article: &Article, bullets: &[&str]) -> ArticleInsight {
        ArticleInsight {
            article_id: article.id.clone(),
            insights: bullets.iter().map(|b| b.to_string()).collect(),
            categories: None,
            confidence: None,
            rationale: None,
        }
    }

    fn sections(blocks: &[Block]) -> Vec<&str> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Section(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_header_only_article() {
        let article = Article::new("Stub", "https://x.example/a", "X");
        let input = ReportInput {
            articles: std::slice::from_ref(&article),
            summaries: &[],
            insights: &[],
            title: "Research Digest: stubs",
        };
        let blocks = layout(&input, at());

        assert_eq!(blocks[0], Block::Title("Research Digest: stubs".to_string()));
        assert_eq!(blocks[1], Block::Subtitle("Generated on 2024-03-01 09:30".to_string()));
        assert!(blocks.contains(&Block::Heading("1. Stub".to_string())));
        assert!(blocks.contains(&Block::Meta("Source: X | Date: N/A | URL: https://x.example/a".to_string())));
        assert!(sections(&blocks).is_empty());
    }

    #[test]
    fn test_follows_article_order_and_joins_by_id() {
        let first = Article::new("First", "https://x/1", "X").with_published_date(Some("2024-02-29".to_string()));
        let second = Article::new("Second", "https://x/2", "Y");
        let articles = vec![first.clone(), second.clone()];
        // Results arrive in a different order than the articles.
        let summaries = vec![summary(&second, "Second happened."), summary(&first, "First happened.")];
        let insights = vec![
            insight(&second, &["Act on B1."]),
            insight(&first, &["Act on A1.", "Act on A2."]),
            insight(&second, &["Act on B2."]),
        ];
        let input = ReportInput {
            articles: &articles,
            summaries: &summaries,
            insights: &insights,
            title: "T",
        };
        let blocks = layout(&input, at());

        let bodies: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Body(s) | Block::Bullet(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            bodies,
            vec!["First happened.", "Act on A1.", "Act on A2.", "Second happened.", "Act on B1.", "Act on B2."]
        );
        assert!(blocks.contains(&Block::Emphasis("Sentiment: positive (confidence=high)".to_string())));
        assert!(blocks.contains(&Block::Meta("Source: X | Date: 2024-02-29 | URL: https://x/1".to_string())));
        assert_eq!(sections(&blocks).len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let article = Article::new("A", "https://x/a", "X");
        let summaries = vec![summary(&article, "S.")];
        let input = ReportInput {
            articles: std::slice::from_ref(&article),
            summaries: &summaries,
            insights: &[],
            title: "T",
        };
        assert_eq!(layout(&input, at()), layout(&input, at()));
    }

    #[test]
    fn test_sentiment_line_without_confidence() {
        let article = Article::new("A", "https://x/a", "X");
        let mut s = summary(&article, "S.");
        s.sentiment = Sentiment::Mixed;
        s.sentiment_confidence = None;
        assert_eq!(sentiment_line(&s), "Sentiment: mixed");
    }
}
