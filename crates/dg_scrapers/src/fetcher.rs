use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use dg_core::types::MIN_TEXT_LEN;
use dg_core::{Article, ArticleFetcher, Result};
use crate::extract::TextExtractor;
use crate::search::{NewsSearch, SearchHit};

/// Search results are not filtered for extractability, so ask for more than we need.
pub fn candidate_count(max_articles: usize) -> usize {
    (max_articles * 2).max(max_articles + 3)
}

/// Normalized form used to spot the same page under slightly different URLs.
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    without_fragment.trim_end_matches('/').to_lowercase()
}

fn source_name(hit: &SearchHit) -> String {
    hit.source
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            url::Url::parse(&hit.link)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

pub struct NewsFetcher {
    search: Arc<dyn NewsSearch>,
    extractor: Arc<dyn TextExtractor>,
    min_text_len: usize,
}

impl NewsFetcher {
    pub fn new(search: Arc<dyn NewsSearch>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            search,
            extractor,
            min_text_len: MIN_TEXT_LEN,
        }
    }

    pub fn with_min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    async fn build_article(&self, hit: &SearchHit) -> Result<Option<Article>> {
        let page = self.extractor.extract(&hit.link).await?;
        let text_len = page.text.trim().chars().count();
        if text_len < self.min_text_len {
            warn!("⚠️ Discarding {}: only {} characters of text", hit.link, text_len);
            return Ok(None);
        }

        let title = Some(hit.title.trim().to_string())
            .filter(|t| !t.is_empty())
            .or(page.title)
            .unwrap_or_else(|| "Untitled".to_string());
        let published_date = hit.date.clone().or(page.published_date);

        Ok(Some(
            Article::new(title, hit.link.clone(), source_name(hit))
                .with_published_date(published_date)
                .with_raw_text(page.text),
        ))
    }
}

#[async_trait]
impl ArticleFetcher for NewsFetcher {
    async fn fetch_articles(&self, query: &str, max_articles: usize) -> Result<Vec<Article>> {
        if max_articles == 0 {
            return Ok(Vec::new());
        }

        let hits = self.search.search(query, candidate_count(max_articles)).await?;
        info!("🔎 {} candidates for '{}'", hits.len(), query);

        let mut seen = HashSet::new();
        let mut articles = Vec::with_capacity(max_articles);

        for hit in &hits {
            if articles.len() >= max_articles {
                break;
            }
            if !seen.insert(normalize_url(&hit.link)) {
                info!("⏭️ Skipping duplicate candidate: {}", hit.link);
                continue;
            }

            info!("⏳ Parsing: {}", if hit.title.is_empty() { &hit.link } else { &hit.title });
            match self.build_article(hit).await {
                Ok(Some(article)) => articles.push(article),
                Ok(None) => {}
                Err(e) => warn!("❌ Failed to parse article {}: {}", hit.link, e),
            }
        }

        info!("✅ Fetcher found {} valid articles", articles.len());
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedPage;
    use dg_core::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockSearch {
        hits: Vec<SearchHit>,
        requested: Mutex<Option<usize>>,
    }

    impl MockSearch {
        fn new(links: &[&str]) -> Self {
            let hits = links
                .iter()
                .enumerate()
                .map(|(i, link)| SearchHit {
                    title: format!("Story {}", i),
                    link: link.to_string(),
                    source: Some("Wire".to_string()),
                    date: None,
                })
                .collect();
            Self {
                hits,
                requested: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl NewsSearch for MockSearch {
        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            *self.requested.lock().unwrap() = Some(limit);
            Ok(self.hits.iter().take(limit).cloned().collect())
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl NewsSearch for FailingSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
            Err(Error::Configuration("SERPAPI_API_KEY not found".to_string()))
        }
    }

    /// Pages keyed by URL; unknown URLs fail like a network error would.
    struct MockExtractor {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl TextExtractor for MockExtractor {
        async fn extract(&self, url: &str) -> Result<ExtractedPage> {
            self.pages
                .get(url)
                .map(|text| ExtractedPage {
                    title: None,
                    text: text.clone(),
                    published_date: Some("2025-01-01".to_string()),
                })
                .ok_or_else(|| Error::Scraping(format!("404 for {}", url)))
        }
    }

    fn long_text() -> String {
        "A sufficiently long paragraph of article text. ".repeat(3)
    }

    #[test]
    fn test_candidate_count_oversamples() {
        assert_eq!(candidate_count(1), 4);
        assert_eq!(candidate_count(3), 6);
        assert_eq!(candidate_count(20), 40);
    }

    #[tokio::test]
    async fn test_skips_failures_and_short_text() {
        let search = Arc::new(MockSearch::new(&[
            "https://a.example/broken",
            "https://a.example/short",
            "https://a.example/good-1",
            "https://a.example/good-1/",
            "https://a.example/good-2",
            "https://a.example/good-3",
        ]));
        let mut pages = HashMap::new();
        pages.insert("https://a.example/short".to_string(), "tiny".to_string());
        pages.insert("https://a.example/good-1".to_string(), long_text());
        pages.insert("https://a.example/good-1/".to_string(), long_text());
        pages.insert("https://a.example/good-2".to_string(), long_text());
        pages.insert("https://a.example/good-3".to_string(), long_text());
        let fetcher = NewsFetcher::new(search.clone(), Arc::new(MockExtractor { pages }));

        let articles = fetcher.fetch_articles("AI", 2).await.unwrap();

        assert_eq!(*search.requested.lock().unwrap(), Some(5));
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://a.example/good-1");
        assert_eq!(articles[1].url, "https://a.example/good-2");
        assert_ne!(articles[0].id, articles[1].id);
        assert_eq!(articles[0].source, "Wire");
        assert_eq!(articles[0].published_date.as_deref(), Some("2025-01-01"));
        assert!(articles.iter().all(|a| a.has_analyzable_text()));
    }

    #[tokio::test]
    async fn test_pool_exhausted_returns_fewer() {
        let search = Arc::new(MockSearch::new(&["https://a.example/only"]));
        let mut pages = HashMap::new();
        pages.insert("https://a.example/only".to_string(), long_text());
        let fetcher = NewsFetcher::new(search, Arc::new(MockExtractor { pages }));

        let articles = fetcher.fetch_articles("AI", 5).await.unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn test_search_errors_propagate() {
        let fetcher = NewsFetcher::new(
            Arc::new(FailingSearch),
            Arc::new(MockExtractor { pages: HashMap::new() }),
        );
        let err = fetcher.fetch_articles("AI", 3).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_source_name_falls_back_to_host() {
        let hit = SearchHit {
            title: String::new(),
            link: "https://www.example.org/story".to_string(),
            source: None,
            date: None,
        };
        assert_eq!(source_name(&hit), "example.org");
    }
}
