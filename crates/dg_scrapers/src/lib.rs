use std::sync::Arc;
use dg_core::{DigestConfig, Result};

pub mod extract;
pub mod fetcher;
pub mod jsonld;
pub mod search;

pub use extract::{HtmlExtractor, TextExtractor};
pub use fetcher::NewsFetcher;
pub use search::{NewsSearch, SerpApiSearch};

/// Build the SerpAPI-backed fetcher. Fails fast when the search key is missing.
pub fn create_fetcher(config: &DigestConfig) -> Result<NewsFetcher> {
    let search = SerpApiSearch::new(config.serpapi_key.clone())?;
    let extractor = HtmlExtractor::new()?;
    Ok(NewsFetcher::new(Arc::new(search), Arc::new(extractor)))
}

pub mod prelude {
    pub use super::{create_fetcher, NewsFetcher};
    pub use dg_core::{Article, ArticleFetcher, Error, Result};
}
