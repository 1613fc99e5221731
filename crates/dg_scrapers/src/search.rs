use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use dg_core::{Error, Result};

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

/// One candidate returned by a news search, before its page is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub source: Option<String>,
    pub date: Option<String>,
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Return up to `limit` candidates in relevance order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    news_results: Vec<NewsResult>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct NewsResult {
    title: Option<String>,
    link: Option<String>,
    source: Option<NewsSource>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct NewsSource {
    name: Option<String>,
}

/// Google News results through SerpAPI.
pub struct SerpApiSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SerpApiSearch {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            Error::Configuration("SERPAPI_API_KEY not found in environment variables.".to_string())
        })?;
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: SERPAPI_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl fmt::Debug for SerpApiSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApiSearch")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn hits_from_response(response: SerpApiResponse, limit: usize) -> Result<Vec<SearchHit>> {
    if let Some(error) = response.error {
        if response.news_results.is_empty() {
            return Err(Error::Scraping(format!("SerpAPI returned an error: {}", error)));
        }
    }

    Ok(response
        .news_results
        .into_iter()
        .filter_map(|item| {
            // Grouped "stories" entries carry no link of their own.
            let link = item.link.filter(|l| !l.trim().is_empty())?;
            Some(SearchHit {
                title: item.title.unwrap_or_default(),
                link,
                source: item.source.and_then(|s| s.name),
                date: item.date,
            })
        })
        .take(limit)
        .collect())
}

#[async_trait]
impl NewsSearch for SerpApiSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        tracing::info!("📡 Searching news for '{}' ({} candidates)", query, limit);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", "google_news"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SerpApiResponse>()
            .await?;

        hits_from_response(response, limit)
    }
}
