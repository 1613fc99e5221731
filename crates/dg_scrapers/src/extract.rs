use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use dg_core::{Error, Result};
use crate::jsonld;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; research-digest/0.1)";

/// Text and metadata pulled out of one downloaded page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
    pub published_date: Option<String>,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedPage>;
}

#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextExtractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedPage> {
        utils::parse_url(url)?;
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_page(&html))
    }
}

/// Pull the readable body out of an article page.
///
/// Preference order for the body: JSON-LD `articleBody`, paragraphs inside `<article>`, every `<p>`.
pub fn parse_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let text = jsonld::extract_article_body(&document)
        .map(|body| clean_paragraphs(body.split("\n").map(str::to_string)))
        .filter(|body| !body.is_empty())
        .or_else(|| {
            utils::extract_texts(&document, "article p")
                .ok()
                .map(clean_paragraphs)
                .filter(|body| !body.is_empty())
        })
        .or_else(|| utils::extract_texts(&document, "p").ok().map(clean_paragraphs))
        .unwrap_or_default();

    let title = utils::extract_attr(&document, "meta[property='og:title']", "content")
        .or_else(|| jsonld::extract_headline(&document))
        .or_else(|| utils::extract_text(&document, "h1").ok())
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty());

    let published_date = jsonld::extract_date_published(&document)
        .or_else(|| utils::extract_attr(&document, "meta[property='article:published_time']", "content"));

    ExtractedPage {
        title,
        text,
        published_date,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_paragraphs<I>(paragraphs: I) -> String
where
    I: IntoIterator<Item = String>,
{
    paragraphs
        .into_iter()
        .map(|p| collapse_whitespace(&p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Common utilities for page parsing
pub(crate) mod utils {
    use super::*;
    use url::Url;

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::Scraping(format!("Failed to parse URL {}: {}", url, e)))
    }

    pub fn extract_text(document: &Html, selector: &str) -> Result<String> {
        let selector = Selector::parse(selector)
            .map_err(|e| Error::Scraping(format!("Invalid selector: {}", e)))?;

        document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .ok_or_else(|| Error::Scraping(format!("No element found for selector: {:?}", selector)))
    }

    pub fn extract_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(selector)
            .map_err(|e| Error::Scraping(format!("Invalid selector: {}", e)))?;

        Ok(document
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect())
    }

    pub fn extract_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(utils::parse_url("https://example.com").is_ok());
        assert!(utils::parse_url("invalid-url").is_err());
    }

    #[test]
    fn test_extract_text() {
        let html = r#"
            <div class="title">Test Title</div>
            <div class="content">Test Content</div>
        "#;
        let document = Html::parse_document(html);

        assert_eq!(utils::extract_text(&document, ".title").unwrap(), "Test Title");
        assert!(utils::extract_text(&document, ".invalid").is_err());
    }

    #[test]
    fn test_prefers_article_paragraphs() {
        let html = r#"
            <html><head>
              <meta property="og:title" content="OG Title">
              <meta property="article:published_time" content="2025-01-05T08:00:00Z">
            </head><body>
              <p>Cookie banner</p>
              <article>
                <h1>Heading</h1>
                <p>First   paragraph
                   of the story.</p>
                <p>   </p>
                <p>Second paragraph.</p>
              </article>
            </body></html>
        "#;
        let page = parse_page(html);
        assert_eq!(page.title.as_deref(), Some("OG Title"));
        assert_eq!(page.published_date.as_deref(), Some("2025-01-05T08:00:00Z"));
        assert_eq!(page.text, "First paragraph of the story.\n\nSecond paragraph.");
    }

    #[test]
    fn test_falls_back_to_all_paragraphs_and_h1() {
        let html = r#"<html><body><h1> Plain page </h1><p>Only text here.</p></body></html>"#;
        let page = parse_page(html);
        assert_eq!(page.title.as_deref(), Some("Plain page"));
        assert_eq!(page.text, "Only text here.");
        assert!(page.published_date.is_none());
    }

    #[test]
    fn test_jsonld_body_wins() {
        let html = r#"
            <script type="application/ld+json">{"headline": "LD", "articleBody": "Line one.\nLine two."}</script>
            <article><p>Teaser only.</p></article>
        "#;
        let page = parse_page(html);
        assert_eq!(page.text, "Line one.\n\nLine two.");
        assert_eq!(page.title.as_deref(), Some("LD"));
    }

    #[test]
    fn test_empty_page() {
        let page = parse_page("<html><body></body></html>");
        assert!(page.text.is_empty());
        assert!(page.title.is_none());
    }
}
