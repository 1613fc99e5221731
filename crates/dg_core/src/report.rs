use std::path::PathBuf;
use crate::types::{Article, ArticleInsight, ArticleSummary};
use crate::Result;

/// Everything the renderer needs, borrowed from the run state.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub articles: &'a [Article],
    pub summaries: &'a [ArticleSummary],
    pub insights: &'a [ArticleInsight],
    pub title: &'a str,
}

pub trait ReportRenderer: Send + Sync {
    /// Render the digest and return the path of the written file.
    fn render(&self, input: ReportInput<'_>) -> Result<PathBuf>;
}
