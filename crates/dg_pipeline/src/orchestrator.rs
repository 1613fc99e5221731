use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use dg_core::types::{MAX_ARTICLES, MIN_ARTICLES};
use dg_core::{DigestConfig, Error, Result};
use crate::patch::StagePatch;
use crate::services::Services;
use crate::stage::{FailurePolicy, StageContext, StageGraph};
use crate::stages::standard_graph;
use crate::state::{RunState, StageEvent, StageName, StageStatus};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Reject a request before any stage runs.
pub fn validate_request(query: &str, max_articles: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::Validation("Query is required".to_string()));
    }
    if !(MIN_ARTICLES..=MAX_ARTICLES).contains(&max_articles) {
        return Err(Error::Validation(format!(
            "Articles must be between {} and {}",
            MIN_ARTICLES, MAX_ARTICLES
        )));
    }
    Ok(())
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

impl Interrupt {
    fn detail(&self) -> &'static str {
        match self {
            Interrupt::Cancelled => "run cancelled",
            Interrupt::TimedOut => "run timed out",
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs a [`StageGraph`] against one [`RunState`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    graph: StageGraph,
    run_timeout: Option<Duration>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(graph: StageGraph) -> Self {
        Self {
            graph,
            run_timeout: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn from_services(services: &Services) -> Result<Self> {
        Ok(Self::new(standard_graph(services)?))
    }

    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        Ok(Self::from_services(&Services::from_config(config)?)?
            .with_run_timeout(config.run_timeout)
            .with_concurrency(config.concurrency))
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub async fn run(&self, query: &str, max_articles: usize) -> Result<RunState> {
        self.run_with_cancel(query, max_articles, CancellationToken::new()).await
    }

    /// Execute every stage in graph order.
    ///
    /// Returns `Err` for invalid input and for configuration errors in required stages.
    /// Cancellation or timeout ends the run early with the state gathered so far.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        max_articles: usize,
        cancel: CancellationToken,
    ) -> Result<RunState> {
        validate_request(query, max_articles)?;

        let mut state = RunState::new(query.trim(), max_articles);
        let ctx = StageContext::new(cancel.child_token(), self.concurrency);
        let deadline = self.run_timeout.map(|timeout| Instant::now() + timeout);
        info!("🚀 Starting digest run for '{}' ({} articles)", state.query(), max_articles);

        let stages = self.graph.stages();
        for (idx, descriptor) in stages.iter().enumerate() {
            let name = descriptor.name;

            if let Some(reason) = descriptor.stage.skip_reason(&state) {
                info!("⏭️ Skipping {}: {}", name, reason);
                state.record(StageEvent::new(name, StageStatus::Skipped).with_detail(reason));
                continue;
            }

            info!("▶️ Stage {}", name);
            let result = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => Err(Interrupt::Cancelled),
                _ = deadline_reached(deadline) => Err(Interrupt::TimedOut),
                output = descriptor.stage.run(&state, &ctx) => Ok(output),
            };

            match result {
                Err(interrupt) => {
                    // The in-flight stage future has been dropped, so nothing it produced is merged.
                    ctx.cancel.cancel();
                    warn!("🛑 {} during {}", interrupt.detail(), name);
                    state.mark_cancelled();
                    state.record(StageEvent::new(name, StageStatus::Cancelled).with_detail(interrupt.detail()));
                    for rest in &stages[idx + 1..] {
                        state.record(StageEvent::new(rest.name, StageStatus::Cancelled).with_detail("not started"));
                    }
                    state.record(StageEvent::new(StageName::End, StageStatus::Cancelled).with_detail(interrupt.detail()));
                    return Ok(state);
                }
                Ok(Ok(output)) => {
                    let fields = state.apply(output.patch);
                    if !output.skipped.is_empty() {
                        info!("✅ {} done, {} items skipped", name, output.skipped.len());
                    } else {
                        info!("✅ {} done", name);
                    }
                    state.record(
                        StageEvent::new(name, StageStatus::Succeeded)
                            .with_fields(fields)
                            .with_skipped(output.skipped),
                    );
                }
                Ok(Err(e)) if e.is_configuration() && descriptor.policy == FailurePolicy::Required => {
                    error!("❌ {} is misconfigured, aborting run: {}", name, e);
                    return Err(e);
                }
                Ok(Err(e)) => {
                    warn!("⚠️ {} failed, continuing with empty output: {}", name, e);
                    let fields = StagePatch::empty(name).map(|patch| state.apply(patch)).unwrap_or(&[]);
                    state.record(
                        StageEvent::new(name, StageStatus::Failed)
                            .with_fields(fields)
                            .with_detail(e.to_string()),
                    );
                }
            }
        }

        state.record(StageEvent::new(StageName::End, StageStatus::Succeeded));
        info!(
            "🏁 Run finished: {} articles, {} summaries, {} insight records",
            state.articles.len(),
            state.summaries.len(),
            state.insights.len()
        );
        Ok(state)
    }
}
