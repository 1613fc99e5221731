//! In-process collaborators for exercising the pipeline without network access.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use dg_core::{
    Article, ArticleFetcher, ArticleInsight, ArticleSummary, CalendarNotifier, Confidence, Error, ExtractInsights,
    ReportInput, ReportRenderer, ReportStore, Result, Sentiment, Summarize,
};
use crate::services::Services;

const BODY: &str = "Regulators published new guidance on model transparency. \
    Companies now have six months to comply. Analysts expect compliance costs to rise.";

/// An article with enough text to be analyzed.
pub fn article(title: &str) -> Article {
    let slug: String = title.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    Article::new(title, format!("https://news.example/{}", slug), "Example Wire")
        .with_published_date(Some("2024-03-01".to_string()))
        .with_raw_text(format!("{} {}", title, BODY))
}

/// An article whose extracted text is only 10 characters.
pub fn short_article(title: &str) -> Article {
    let slug: String = title.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    Article::new(title, format!("https://news.example/{}", slug), "Example Wire").with_raw_text("ten chars!")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Recoverable,
    Configuration,
}

impl Failure {
    fn error(self, what: &str) -> Error {
        match self {
            Failure::Recoverable => Error::External(std::io::Error::other(format!("{} failed", what)).into()),
            Failure::Configuration => Error::Configuration(format!("{} is not configured", what)),
        }
    }
}

/// Counts calls and the peak number of concurrent calls.
#[derive(Debug, Default)]
pub struct CallTracker {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallTracker {
    /// Returns the 1-based number of this call.
    fn enter(&self) -> usize {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        call
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct StubFetcher {
    articles: Vec<Article>,
    failure: Option<Failure>,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            ..Self::default()
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ArticleFetcher for StubFetcher {
    async fn fetch_articles(&self, _query: &str, max_articles: usize) -> Result<Vec<Article>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure.error("search"));
        }
        Ok(self.articles.iter().take(max_articles).cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct StubSummarizer {
    tracker: CallTracker,
    delays: HashMap<String, Duration>,
    delay: Duration,
    failing: HashSet<String>,
    failing_first: usize,
}

impl StubSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// The first article finishes last.
    pub fn with_descending_delays(mut self, articles: &[Article]) -> Self {
        let n = articles.len() as u64;
        for (i, article) in articles.iter().enumerate() {
            self.delays
                .insert(article.id.clone(), Duration::from_millis((n - i as u64) * 15));
        }
        self
    }

    pub fn failing_for(mut self, article_id: &str) -> Self {
        self.failing.insert(article_id.to_string());
        self
    }

    /// The first `n` calls fail regardless of article.
    pub fn failing_first_calls(mut self, n: usize) -> Self {
        self.failing_first = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.tracker.calls()
    }

    pub fn max_in_flight(&self) -> usize {
        self.tracker.max_in_flight()
    }
}

#[async_trait]
impl Summarize for StubSummarizer {
    async fn summarize(&self, article: &Article) -> Result<Option<ArticleSummary>> {
        let call = self.tracker.enter();
        let delay = self.delays.get(&article.id).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;
        self.tracker.exit();

        if call <= self.failing_first || self.failing.contains(&article.id) {
            return Err(Failure::Recoverable.error("summary"));
        }
        let Some(text) = article.analyzable_text() else {
            return Ok(None);
        };
        let first = text.split(". ").next().unwrap_or(text).trim_end_matches('.');
        Ok(Some(ArticleSummary {
            article_id: article.id.clone(),
            summary: format!("{}.", first),
            sentiment: Sentiment::Neutral,
            sentiment_confidence: Some(Confidence::Medium),
            sentiment_reason: None,
        }))
    }
}

#[derive(Debug, Default)]
pub struct StubInsights {
    tracker: CallTracker,
    failing: HashSet<String>,
    misconfigured: bool,
    delay: Duration,
}

impl StubInsights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, article_id: &str) -> Self {
        self.failing.insert(article_id.to_string());
        self
    }

    pub fn misconfigured(mut self) -> Self {
        self.misconfigured = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.tracker.calls()
    }
}

#[async_trait]
impl ExtractInsights for StubInsights {
    async fn extract_insights(&self, article: &Article) -> Result<Option<ArticleInsight>> {
        self.tracker.enter();
        tokio::time::sleep(self.delay).await;
        self.tracker.exit();

        if self.misconfigured {
            return Err(Failure::Configuration.error("model"));
        }
        if self.failing.contains(&article.id) {
            return Err(Failure::Recoverable.error("insights"));
        }
        if !article.has_analyzable_text() {
            return Ok(None);
        }
        Ok(Some(ArticleInsight {
            article_id: article.id.clone(),
            insights: vec![format!("Track follow-ups on {}.", article.title), "Budget for compliance.".to_string()],
            categories: Some(vec!["policy".to_string()]),
            confidence: Some(Confidence::Medium),
            rationale: None,
        }))
    }
}

/// Stands in for a full disk.
#[derive(Debug, Default)]
pub struct FailingRenderer;

impl ReportRenderer for FailingRenderer {
    fn render(&self, _input: ReportInput<'_>) -> Result<PathBuf> {
        Err(Error::Io(std::io::Error::other("No space left on device")))
    }
}

/// Records every upload and hands out sequential ids.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub uploads: Mutex<Vec<PathBuf>>,
    pub failure: Option<Failure>,
}

impl RecordingStore {
    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReportStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upload_report(&self, path: &Path) -> Result<String> {
        if let Some(failure) = self.failure {
            return Err(failure.error("upload"));
        }
        let mut uploads = self.uploads.lock().map_err(|e| Error::Storage(e.to_string()))?;
        uploads.push(path.to_path_buf());
        Ok(format!("file-{}", uploads.len()))
    }
}

/// Records every event as `(report_name, drive_file_id)`.
#[derive(Debug, Default)]
pub struct RecordingCalendar {
    pub events: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingCalendar {
    pub fn events(&self) -> Vec<(String, Option<String>)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CalendarNotifier for RecordingCalendar {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_report_event(
        &self,
        report_name: &str,
        _generated_at: DateTime<Local>,
        drive_file_id: Option<&str>,
    ) -> Result<String> {
        let mut events = self.events.lock().map_err(|e| Error::Calendar(e.to_string()))?;
        events.push((report_name.to_string(), drive_file_id.map(str::to_string)));
        Ok(format!("event-{}", events.len()))
    }
}

/// Stub analysis services, a real PDF renderer under `reports_dir`, and recording upload/calendar.
pub fn stub_services(articles: Vec<Article>, reports_dir: &Path) -> Services {
    Services {
        fetcher: Arc::new(StubFetcher::new(articles)),
        summarizer: Arc::new(StubSummarizer::new()),
        insights: Arc::new(StubInsights::new()),
        renderer: Arc::new(dg_report::PdfReportRenderer::new(reports_dir)),
        store: Some(Arc::new(RecordingStore::default())),
        calendar: Some(Arc::new(RecordingCalendar::default())),
    }
}
