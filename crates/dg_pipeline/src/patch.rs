use dg_core::{Article, ArticleInsight, ArticleSummary};
use crate::state::StageName;

/// The partial output of one stage: only the fields that stage produces.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePatch {
    Fetch { articles: Vec<Article> },
    Insights { insights: Vec<ArticleInsight> },
    Summaries { summaries: Vec<ArticleSummary> },
    Report { report_path: String },
    Upload { drive_file_id: String },
    Notify { calendar_event_id: String },
}

impl StagePatch {
    pub fn stage(&self) -> StageName {
        match self {
            StagePatch::Fetch { .. } => StageName::Fetch,
            StagePatch::Insights { .. } => StageName::Insights,
            StagePatch::Summaries { .. } => StageName::Summarize,
            StagePatch::Report { .. } => StageName::Report,
            StagePatch::Upload { .. } => StageName::Upload,
            StagePatch::Notify { .. } => StageName::Notify,
        }
    }

    /// RunState fields this patch writes.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            StagePatch::Fetch { .. } => &["articles"],
            StagePatch::Insights { .. } => &["insights"],
            StagePatch::Summaries { .. } => &["summaries"],
            StagePatch::Report { .. } => &["report_path"],
            StagePatch::Upload { .. } => &["drive_file_id"],
            StagePatch::Notify { .. } => &["calendar_event_id"],
        }
    }

    /// The default-valued patch recorded when a stage fails. `End` produces nothing.
    pub fn empty(stage: StageName) -> Option<Self> {
        let patch = match stage {
            StageName::Fetch => StagePatch::Fetch { articles: Vec::new() },
            StageName::Insights => StagePatch::Insights { insights: Vec::new() },
            StageName::Summarize => StagePatch::Summaries { summaries: Vec::new() },
            StageName::Report => StagePatch::Report { report_path: String::new() },
            StageName::Upload => StagePatch::Upload { drive_file_id: String::new() },
            StageName::Notify => StagePatch::Notify { calendar_event_id: String::new() },
            StageName::End => return None,
        };
        Some(patch)
    }
}
