use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use dg_core::types::{DEFAULT_ARTICLES, DEFAULT_QUERY, MAX_ARTICLES, MIN_ARTICLES};
use dg_core::{Article, ArticleInsight, ArticleSummary, Confidence, Sentiment};
use dg_pipeline::{RunOutcome, RunState, StageEvent};
use crate::error::ApiError;
use crate::AppState;

const RAW_TEXT_PREVIEW: usize = 500;

#[derive(Debug, Serialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_date: Option<String>,
    pub raw_text: Option<String>,
}

impl From<&Article> for ArticleView {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            published_date: article.published_date.clone(),
            raw_text: article.raw_text.as_deref().map(preview),
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(RAW_TEXT_PREVIEW) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub article_id: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub sentiment_confidence: Option<Confidence>,
}

impl From<&ArticleSummary> for SummaryView {
    fn from(summary: &ArticleSummary) -> Self {
        Self {
            article_id: summary.article_id.clone(),
            summary: summary.summary.clone(),
            sentiment: summary.sentiment,
            sentiment_confidence: summary.sentiment_confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InsightView {
    pub article_id: String,
    pub insights: Vec<String>,
    pub categories: Option<Vec<String>>,
    pub confidence: Option<Confidence>,
}

impl From<&ArticleInsight> for InsightView {
    fn from(insight: &ArticleInsight) -> Self {
        Self {
            article_id: insight.article_id.clone(),
            insights: insight.insights.clone(),
            categories: insight.categories.clone(),
            confidence: insight.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DigestResponse {
    pub query: String,
    pub articles_count: usize,
    pub articles: Vec<ArticleView>,
    pub summaries: Vec<SummaryView>,
    pub insights: Vec<InsightView>,
    pub report_path: String,
    pub calendar_event_id: String,
    pub drive_file_id: String,
    pub generated_at: String,
    pub outcome: RunOutcome,
    pub stage_log: Vec<StageEvent>,
}

impl From<RunState> for DigestResponse {
    fn from(state: RunState) -> Self {
        Self {
            query: state.query().to_string(),
            articles_count: state.articles.len(),
            articles: state.articles.iter().map(ArticleView::from).collect(),
            summaries: state.summaries.iter().map(SummaryView::from).collect(),
            insights: state.insights.iter().map(InsightView::from).collect(),
            report_path: state.report_path.replace('\\', "/"),
            calendar_event_id: state.calendar_event_id.clone(),
            drive_file_id: state.drive_file_id.clone(),
            generated_at: Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            outcome: state.outcome(),
            stage_log: state.stage_log().to_vec(),
        }
    }
}

/// Read `{query, articles}` the way the front-end sends it.
pub fn parse_digest_request(body: &[u8]) -> Result<(String, usize), ApiError> {
    let data: Value = serde_json::from_slice(body).map_err(|_| ApiError::bad_request("No data provided"))?;
    let Some(data) = data.as_object().filter(|map| !map.is_empty()) else {
        return Err(ApiError::bad_request("No data provided"));
    };

    let query = match data.get("query") {
        None => DEFAULT_QUERY.to_string(),
        Some(value) => value.as_str().unwrap_or_default().to_string(),
    };
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }

    let articles = match data.get("articles") {
        None => Some(DEFAULT_ARTICLES as u64),
        Some(value) => value.as_u64(),
    };
    let articles = articles
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| (MIN_ARTICLES..=MAX_ARTICLES).contains(n))
        .ok_or_else(|| {
            ApiError::bad_request(format!("Articles must be between {} and {}", MIN_ARTICLES, MAX_ARTICLES))
        })?;

    Ok((query, articles))
}

pub async fn generate_digest(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<DigestResponse>, ApiError> {
    let (query, articles) = parse_digest_request(&body)?;
    info!("🌊 Generating digest for query: '{}' with {} articles", query, articles);

    let run = async {
        let pipeline = (state.pipeline)()?;
        pipeline.run(&query, articles).await
    };
    match run.await {
        Ok(final_state) => Ok(Json(DigestResponse::from(final_state))),
        Err(e) => {
            error!("❌ Error generating digest: {}", e);
            Err(ApiError::from(e))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub path: Option<String>,
}

pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let requested = params
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No report path provided"))?;
    let path = state
        .resolve_report(&requested)
        .ok_or_else(|| ApiError::bad_request("Invalid report path"))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Report file not found"));
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to download report: {}", e))),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_else(|| "report.pdf".to_string());

    info!("📥 Serving report {}", path.display());
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        "service": "Daily Research Digest API",
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let text = "é".repeat(600);
        let shown = preview(&text);
        assert_eq!(shown.chars().count(), RAW_TEXT_PREVIEW + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
        assert_eq!(preview(&"x".repeat(500)), "x".repeat(500));
    }

    #[test]
    fn test_parse_digest_request() {
        assert_eq!(parse_digest_request(b"{}").unwrap_err().message, "No data provided");
        assert_eq!(parse_digest_request(b"not json").unwrap_err().message, "No data provided");
        assert_eq!(
            parse_digest_request(br#"{"articles": 3}"#).unwrap(),
            (DEFAULT_QUERY.to_string(), 3)
        );
        assert_eq!(parse_digest_request(br#"{"query": "AI"}"#).unwrap(), ("AI".to_string(), 5));
        assert_eq!(parse_digest_request(br#"{"query": "  "}"#).unwrap_err().message, "Query is required");
        for bad in [r#"{"articles": 0}"#, r#"{"articles": 21}"#, r#"{"articles": "5"}"#, r#"{"articles": 2.5}"#, r#"{"articles": -1}"#] {
            assert_eq!(
                parse_digest_request(bad.as_bytes()).unwrap_err().message,
                "Articles must be between 1 and 20"
            );
        }
    }
}
