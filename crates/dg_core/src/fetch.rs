use async_trait::async_trait;
use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Fetch up to `max_articles` articles with extracted text for `query`.
    ///
    /// Individual candidates that fail to download or parse are skipped.
    /// Errors only when the search backend itself is unusable.
    async fn fetch_articles(&self, query: &str, max_articles: usize) -> Result<Vec<Article>>;
}
