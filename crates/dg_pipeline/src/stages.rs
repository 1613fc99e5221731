use async_trait::async_trait;
use chrono::Local;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use dg_core::{
    Article, ArticleFetcher, ArticleInsight, ArticleSummary, CalendarNotifier, Error, ExtractInsights, ReportInput,
    ReportRenderer, ReportStore, Result, Summarize,
};
use crate::patch::StagePatch;
use crate::services::Services;
use crate::stage::{FailurePolicy, Stage, StageContext, StageGraph, StageOutput};
use crate::state::{RunState, SkippedItem, StageName};

pub const INSUFFICIENT_TEXT: &str = "insufficient text";
pub const NO_RESULT: &str = "no result";
pub const DUPLICATE_ARTICLE: &str = "duplicate article id";
pub const NOT_STARTED: &str = "cancelled before the call was issued";

/// Fetch, insights, summarize, report, upload, notify.
pub fn standard_graph(services: &Services) -> Result<StageGraph> {
    StageGraph::builder()
        .stage(None, FailurePolicy::Required, Arc::new(FetchStage::new(services.fetcher.clone())))
        .stage(
            Some(StageName::Fetch),
            FailurePolicy::Required,
            Arc::new(InsightsStage::new(services.insights.clone())),
        )
        .stage(
            Some(StageName::Insights),
            FailurePolicy::Required,
            Arc::new(SummarizeStage::new(services.summarizer.clone())),
        )
        .stage(
            Some(StageName::Summarize),
            FailurePolicy::BestEffort,
            Arc::new(ReportStage::new(services.renderer.clone())),
        )
        .stage(
            Some(StageName::Report),
            FailurePolicy::BestEffort,
            Arc::new(UploadStage::new(services.store.clone())),
        )
        .stage(
            Some(StageName::Upload),
            FailurePolicy::BestEffort,
            Arc::new(NotifyStage::new(services.calendar.clone())),
        )
        .build()
}

/// Run `call` once per distinct article id, in rounds.
///
/// Round `n` holds the `n`-th copy of each id. A later copy is dispatched only when
/// no earlier copy produced a result; otherwise it is skipped as a duplicate.
async fn analyze_each<'a, T, F, Fut>(
    articles: &'a [Article],
    ctx: &StageContext,
    call: F,
    article_id: impl Fn(&T) -> &str,
) -> Result<(Vec<T>, Vec<SkippedItem>)>
where
    F: Fn(&'a Article) -> Fut,
    Fut: Future<Output = Result<Option<T>>> + 'a,
{
    let mut skipped = Vec::new();
    let mut rounds: Vec<Vec<&'a Article>> = Vec::new();
    let mut copies: HashMap<&str, usize> = HashMap::new();
    for article in articles {
        if !article.has_analyzable_text() {
            skipped.push(SkippedItem::new(&article.id, INSUFFICIENT_TEXT));
            continue;
        }
        let copy = copies.entry(article.id.as_str()).or_insert(0);
        if rounds.len() <= *copy {
            rounds.push(Vec::new());
        }
        rounds[*copy].push(article);
        *copy += 1;
    }

    let mut results = Vec::new();
    let mut produced: HashSet<String> = HashSet::new();
    for (round, batch) in rounds.into_iter().enumerate() {
        let (pending, duplicates): (Vec<_>, Vec<_>) =
            batch.into_iter().partition(|a| !produced.contains(&a.id));
        skipped.extend(duplicates.iter().map(|a| SkippedItem::new(&a.id, DUPLICATE_ARTICLE)));
        if pending.is_empty() {
            continue;
        }
        if round > 0 {
            info!("🔁 Retrying {} repeated articles without a result", pending.len());
        }
        let (items, failed) = fan_out(pending, ctx, &call).await?;
        produced.extend(items.iter().map(|item| article_id(item).to_string()));
        results.extend(items);
        skipped.extend(failed);
    }
    Ok((results, skipped))
}

/// Run `call` for every article, at most `ctx.concurrency` at a time.
///
/// Results come back in completion order. Configuration errors abort the whole
/// fan-out; any other per-article error becomes a skip record.
async fn fan_out<'a, T, F, Fut>(
    articles: Vec<&'a Article>,
    ctx: &StageContext,
    call: F,
) -> Result<(Vec<T>, Vec<SkippedItem>)>
where
    F: Fn(&'a Article) -> Fut,
    Fut: Future<Output = Result<Option<T>>> + 'a,
{
    let semaphore = Arc::new(Semaphore::new(ctx.concurrency));
    let mut pending = FuturesUnordered::new();

    for article in articles {
        let semaphore = Arc::clone(&semaphore);
        let cancel = ctx.cancel.clone();
        let work = call(article);
        pending.push(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (article, Some(Err(Error::External(e.into())))),
            };
            if cancel.is_cancelled() {
                return (article, None);
            }
            (article, Some(work.await))
        });
    }

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    while let Some((article, result)) = pending.next().await {
        match result {
            None => skipped.push(SkippedItem::new(&article.id, NOT_STARTED)),
            Some(Ok(Some(item))) => results.push(item),
            Some(Ok(None)) => skipped.push(SkippedItem::new(&article.id, NO_RESULT)),
            Some(Err(e)) if e.is_configuration() => return Err(e),
            Some(Err(e)) => {
                warn!("⚠️ '{}' skipped: {}", article.title, e);
                skipped.push(SkippedItem::new(&article.id, e.to_string()));
            }
        }
    }
    Ok((results, skipped))
}

/// Restore fetch order. Items whose article is unknown are dropped.
pub fn order_by_articles<T>(items: Vec<T>, articles: &[Article], article_id: impl Fn(&T) -> &str) -> Vec<T> {
    let positions: HashMap<&str, usize> = articles
        .iter()
        .enumerate()
        .rev()
        .map(|(i, a)| (a.id.as_str(), i))
        .collect();

    let mut ordered: Vec<(usize, T)> = items
        .into_iter()
        .filter_map(|item| {
            let position = positions.get(article_id(&item)).copied();
            match position {
                Some(position) => Some((position, item)),
                None => {
                    warn!("⚠️ Dropping result for unknown article {}", article_id(&item));
                    None
                }
            }
        })
        .collect();
    ordered.sort_by_key(|(position, _)| *position);
    ordered.into_iter().map(|(_, item)| item).collect()
}

fn sort_skipped(mut skipped: Vec<SkippedItem>, articles: &[Article]) -> Vec<SkippedItem> {
    let position = |id: &str| articles.iter().position(|a| a.id == id).unwrap_or(usize::MAX);
    skipped.sort_by_key(|item| position(&item.article_id));
    skipped
}

pub struct FetchStage {
    fetcher: Arc<dyn ArticleFetcher>,
}

impl FetchStage {
    pub fn new(fetcher: Arc<dyn ArticleFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn name(&self) -> StageName {
        StageName::Fetch
    }

    async fn run(&self, state: &RunState, _ctx: &StageContext) -> Result<StageOutput> {
        info!("🔍 Fetching up to {} articles for '{}'", state.max_articles(), state.query());
        let mut articles = self.fetcher.fetch_articles(state.query(), state.max_articles()).await?;
        if articles.len() > state.max_articles() {
            warn!("⚠️ Fetcher returned {} articles, keeping {}", articles.len(), state.max_articles());
            articles.truncate(state.max_articles());
        }
        if articles.is_empty() {
            warn!("⚠️ No articles found for '{}'", state.query());
        }
        info!("📰 Fetched {} articles", articles.len());
        Ok(StageOutput::new(StagePatch::Fetch { articles }))
    }
}

pub struct InsightsStage {
    extractor: Arc<dyn ExtractInsights>,
}

impl InsightsStage {
    pub fn new(extractor: Arc<dyn ExtractInsights>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Stage for InsightsStage {
    fn name(&self) -> StageName {
        StageName::Insights
    }

    async fn run(&self, state: &RunState, ctx: &StageContext) -> Result<StageOutput> {
        info!("💡 Extracting insights from {} articles", state.articles.len());

        let extractor = &self.extractor;
        let (insights, skipped) = analyze_each(
            &state.articles,
            ctx,
            |article| extractor.extract_insights(article),
            |i: &ArticleInsight| i.article_id.as_str(),
        )
        .await?;

        let insights = order_by_articles(insights, &state.articles, |i| i.article_id.as_str());
        info!("✨ {} insight records", insights.len());
        Ok(StageOutput::new(StagePatch::Insights { insights }).with_skipped(sort_skipped(skipped, &state.articles)))
    }
}

pub struct SummarizeStage {
    summarizer: Arc<dyn Summarize>,
}

impl SummarizeStage {
    pub fn new(summarizer: Arc<dyn Summarize>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn name(&self) -> StageName {
        StageName::Summarize
    }

    async fn run(&self, state: &RunState, ctx: &StageContext) -> Result<StageOutput> {
        info!("📝 Summarizing {} articles", state.articles.len());

        let summarizer = &self.summarizer;
        let (summaries, skipped) = analyze_each(
            &state.articles,
            ctx,
            |article| summarizer.summarize(article),
            |s: &ArticleSummary| s.article_id.as_str(),
        )
        .await?;

        // At most one summary per article.
        let mut seen = HashSet::new();
        let summaries: Vec<_> = order_by_articles(summaries, &state.articles, |s| s.article_id.as_str())
            .into_iter()
            .filter(|s| seen.insert(s.article_id.clone()))
            .collect();

        info!("✨ {} summaries", summaries.len());
        Ok(StageOutput::new(StagePatch::Summaries { summaries }).with_skipped(sort_skipped(skipped, &state.articles)))
    }
}

pub struct ReportStage {
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportStage {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Stage for ReportStage {
    fn name(&self) -> StageName {
        StageName::Report
    }

    async fn run(&self, state: &RunState, _ctx: &StageContext) -> Result<StageOutput> {
        let renderer = Arc::clone(&self.renderer);
        let articles = state.articles.clone();
        let summaries = state.summaries.clone();
        let insights = state.insights.clone();
        let title = dg_report::default_title(state.query());

        info!("📄 Rendering report: {}", title);
        let path: PathBuf = tokio::task::spawn_blocking(move || {
            renderer.render(ReportInput {
                articles: &articles,
                summaries: &summaries,
                insights: &insights,
                title: &title,
            })
        })
        .await
        .map_err(|e| Error::External(e.into()))??;

        Ok(StageOutput::new(StagePatch::Report {
            report_path: path.to_string_lossy().into_owned(),
        }))
    }
}

pub struct UploadStage {
    store: Option<Arc<dyn ReportStore>>,
}

impl UploadStage {
    pub fn new(store: Option<Arc<dyn ReportStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for UploadStage {
    fn name(&self) -> StageName {
        StageName::Upload
    }

    fn skip_reason(&self, state: &RunState) -> Option<String> {
        if state.report_path.is_empty() {
            return Some("no report to upload".to_string());
        }
        self.store.is_none().then(|| "no upload backend configured".to_string())
    }

    async fn run(&self, state: &RunState, _ctx: &StageContext) -> Result<StageOutput> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::Configuration("no upload backend configured".to_string()))?;
        info!("☁️ Uploading report via {}", store.name());
        let drive_file_id = store.upload_report(Path::new(&state.report_path)).await?;
        Ok(StageOutput::new(StagePatch::Upload { drive_file_id }))
    }
}

pub struct NotifyStage {
    calendar: Option<Arc<dyn CalendarNotifier>>,
}

impl NotifyStage {
    pub fn new(calendar: Option<Arc<dyn CalendarNotifier>>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Stage for NotifyStage {
    fn name(&self) -> StageName {
        StageName::Notify
    }

    fn skip_reason(&self, state: &RunState) -> Option<String> {
        if state.report_path.is_empty() {
            return Some("no report to announce".to_string());
        }
        self.calendar.is_none().then(|| "no calendar configured".to_string())
    }

    async fn run(&self, state: &RunState, _ctx: &StageContext) -> Result<StageOutput> {
        let calendar = self
            .calendar
            .as_ref()
            .ok_or_else(|| Error::Configuration("no calendar configured".to_string()))?;
        let report_name = Path::new(&state.report_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| state.report_path.clone());
        let drive_file_id = Some(state.drive_file_id.as_str()).filter(|id| !id.is_empty());

        info!("📅 Creating calendar event via {}", calendar.name());
        let calendar_event_id = calendar
            .create_report_event(&report_name, Local::now(), drive_file_id)
            .await?;
        Ok(StageOutput::new(StagePatch::Notify { calendar_event_id }))
    }
}
