use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use dg_core::{Article, ArticleInsight, ArticleSummary};
use crate::patch::StagePatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Fetch,
    Insights,
    Summarize,
    Report,
    Upload,
    Notify,
    End,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Fetch => "fetch",
            StageName::Insights => "insights",
            StageName::Summarize => "summarize",
            StageName::Report => "report",
            StageName::Upload => "upload",
            StageName::Notify => "notify",
            StageName::End => "end",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
    Cancelled,
}

/// An article a stage left out of its output, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub article_id: String,
    pub reason: String,
}

impl SkippedItem {
    pub fn new(article_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEvent {
    pub stage: StageName,
    pub at: DateTime<Utc>,
    pub status: StageStatus,
    pub fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_items: Vec<SkippedItem>,
}

impl StageEvent {
    pub fn new(stage: StageName, status: StageStatus) -> Self {
        Self {
            stage,
            at: Utc::now(),
            status,
            fields: Vec::new(),
            detail: None,
            skipped_items: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: &[&'static str]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_skipped(mut self, skipped: Vec<SkippedItem>) -> Self {
        self.skipped_items = skipped;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// The single aggregate threaded through one run.
///
/// Stages only ever see `&RunState`; the orchestrator is the only writer, through
/// [`RunState::apply`] for stage output and [`RunState::record`] for the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    query: String,
    max_articles: usize,
    pub articles: Vec<Article>,
    pub summaries: Vec<ArticleSummary>,
    pub insights: Vec<ArticleInsight>,
    pub report_path: String,
    pub drive_file_id: String,
    pub calendar_event_id: String,
    stage_log: Vec<StageEvent>,
    outcome: RunOutcome,
}

impl RunState {
    pub fn new(query: impl Into<String>, max_articles: usize) -> Self {
        Self {
            query: query.into(),
            max_articles,
            articles: Vec::new(),
            summaries: Vec::new(),
            insights: Vec::new(),
            report_path: String::new(),
            drive_file_id: String::new(),
            calendar_event_id: String::new(),
            stage_log: Vec::new(),
            outcome: RunOutcome::Completed,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn max_articles(&self) -> usize {
        self.max_articles
    }

    pub fn stage_log(&self) -> &[StageEvent] {
        &self.stage_log
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// Field-level replace: every field the patch carries overwrites the current value.
    /// Applying the same patch twice leaves the state as applying it once.
    pub fn apply(&mut self, patch: StagePatch) -> &'static [&'static str] {
        let fields = patch.fields();
        match patch {
            StagePatch::Fetch { articles } => self.articles = articles,
            StagePatch::Insights { insights } => self.insights = insights,
            StagePatch::Summaries { summaries } => self.summaries = summaries,
            StagePatch::Report { report_path } => self.report_path = report_path,
            StagePatch::Upload { drive_file_id } => self.drive_file_id = drive_file_id,
            StagePatch::Notify { calendar_event_id } => self.calendar_event_id = calendar_event_id,
        }
        fields
    }

    /// Append-only.
    pub fn record(&mut self, event: StageEvent) {
        self.stage_log.push(event);
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.outcome = RunOutcome::Cancelled;
    }

    /// Position of an article in fetch order.
    pub fn article_position(&self, article_id: &str) -> Option<usize> {
        self.articles.iter().position(|a| a.id == article_id)
    }

    pub fn last_event(&self, stage: StageName) -> Option<&StageEvent> {
        self.stage_log.iter().rev().find(|e| e.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::Sentiment;

    fn summary(id: &str) -> ArticleSummary {
        ArticleSummary {
            article_id: id.to_string(),
            summary: "Something happened.".to_string(),
            sentiment: Sentiment::Neutral,
            sentiment_confidence: None,
            sentiment_reason: None,
        }
    }

    #[test]
    fn test_apply_replaces_lists() {
        let mut state = RunState::new("AI", 3);
        state.apply(StagePatch::Summaries { summaries: vec![summary("a"), summary("b")] });
        let fields = state.apply(StagePatch::Summaries { summaries: vec![summary("c")] });

        assert_eq!(fields, &["summaries"]);
        assert_eq!(state.summaries, vec![summary("c")]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let patch = StagePatch::Fetch {
            articles: vec![Article::new("A", "https://x/a", "X"), Article::new("B", "https://x/b", "X")],
        };
        let mut once = RunState::new("AI", 3);
        once.apply(patch.clone());

        let mut twice = once.clone();
        twice.apply(patch);
        assert_eq!(once, twice);
        assert_eq!(twice.articles.len(), 2);
    }

    #[test]
    fn test_apply_touches_only_its_field() {
        let mut state = RunState::new("AI", 3);
        state.apply(StagePatch::Report { report_path: "data/reports/r.pdf".to_string() });
        state.apply(StagePatch::Upload { drive_file_id: String::new() });

        assert_eq!(state.report_path, "data/reports/r.pdf");
        assert_eq!(state.drive_file_id, "");
        assert_eq!(state.query(), "AI");
        assert_eq!(state.max_articles(), 3);
        assert!(state.stage_log().is_empty());
    }

    #[test]
    fn test_stage_log_serializes() {
        let mut state = RunState::new("AI", 1);
        state.record(
            StageEvent::new(StageName::Summarize, StageStatus::Succeeded)
                .with_fields(&["summaries"])
                .with_skipped(vec![SkippedItem::new("a1", "insufficient text")]),
        );
        state.record(StageEvent::new(StageName::Upload, StageStatus::Skipped).with_detail("no report"));

        let json = serde_json::to_value(state.stage_log()).unwrap();
        assert_eq!(json[0]["stage"], "summarize");
        assert_eq!(json[0]["status"], "succeeded");
        assert_eq!(json[0]["skipped_items"][0]["article_id"], "a1");
        assert!(json[0].get("detail").is_none());
        assert_eq!(json[1]["detail"], "no report");
        assert_eq!(state.last_event(StageName::Upload).unwrap().status, StageStatus::Skipped);
    }
}
