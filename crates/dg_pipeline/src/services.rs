use std::fmt;
use std::sync::Arc;
use dg_core::{
    ArticleFetcher, CalendarNotifier, DigestConfig, ExtractInsights, ReportRenderer, ReportStore, Result, Summarize,
};

/// The external collaborators a run calls. Upload and calendar are optional.
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn ArticleFetcher>,
    pub summarizer: Arc<dyn Summarize>,
    pub insights: Arc<dyn ExtractInsights>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub store: Option<Arc<dyn ReportStore>>,
    pub calendar: Option<Arc<dyn CalendarNotifier>>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .field("calendar", &self.calendar.as_ref().map(|c| c.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Wire the real collaborators. Missing search or model keys fail here.
    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        let fetcher = dg_scrapers::create_fetcher(config)?;
        let (summarizer, insights) = dg_inference::create_analyzers(config)?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            summarizer: Arc::new(summarizer),
            insights: Arc::new(insights),
            renderer: Arc::new(dg_report::create_renderer(config)),
            store: dg_storage::create_store(config)?,
            calendar: dg_storage::create_calendar(config)?,
        })
    }
}
