use axum::{
    handler::HandlerWithoutStateExt,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, PipelineFactory};

pub const INDEX_PAGE: &str = "DailyDigest.html";

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();
    let index = ServeFile::new(state.static_dir.join(INDEX_PAGE));
    let assets = ServeDir::new(&state.static_dir).not_found_service(handlers::not_found.into_service());

    Router::new()
        .route("/api/generate-digest", post(handlers::generate_digest))
        .route("/api/health", get(handlers::health))
        .route("/download-report", get(handlers::download_report))
        .route_service("/", index)
        .fallback_service(assets)
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use dg_core::{Error, Result};
    pub use crate::{create_app, ApiError, AppState, PipelineFactory};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dg_pipeline::test_utils::{article, stub_services};
    use dg_pipeline::Pipeline;
    use serde_json::Value;
    use std::path::Path;
    use tower::ServiceExt;

    fn app_with(reports_dir: &Path, articles: usize) -> Router {
        let dir = reports_dir.to_path_buf();
        let factory: PipelineFactory = Arc::new(move || {
            let found = (0..articles).map(|i| article(&format!("Story {}", i + 1))).collect();
            Pipeline::from_services(&stub_services(found, &dir))
        });
        create_app(AppState::new(factory, reports_dir, reports_dir.join("frontend")))
    }

    fn post_digest(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate-digest")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_article_count_bounds() {
        let tmp = tempfile::tempdir().unwrap();

        for bad in [0, 21] {
            let response = app_with(tmp.path(), 20)
                .oneshot(post_digest(&format!(r#"{{"query": "AI", "articles": {}}}"#, bad)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "Articles must be between 1 and 20");
        }

        for ok in [1, 20] {
            let response = app_with(tmp.path(), 20)
                .oneshot(post_digest(&format!(r#"{{"query": "AI", "articles": {}}}"#, ok)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["articles_count"], ok);
            assert_eq!(body["query"], "AI");
            assert_eq!(body["outcome"], "completed");
        }
    }

    #[tokio::test]
    async fn test_full_digest_response() {
        let tmp = tempfile::tempdir().unwrap();
        let response = app_with(tmp.path(), 2)
            .oneshot(post_digest(r#"{"query": "AI regulation", "articles": 2}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["summaries"].as_array().unwrap().len(), 2);
        assert_eq!(body["insights"].as_array().unwrap().len(), 2);
        assert_eq!(body["summaries"][0]["sentiment"], "neutral");
        assert_eq!(body["drive_file_id"], "file-1");
        assert_eq!(body["calendar_event_id"], "event-1");
        let report_path = body["report_path"].as_str().unwrap();
        assert!(report_path.ends_with(".pdf"));
        assert!(!report_path.contains('\\'));
        assert!(Path::new(report_path).exists());

        let stages: Vec<&str> = body["stage_log"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["stage"].as_str().unwrap())
            .collect();
        assert_eq!(stages, ["fetch", "insights", "summarize", "report", "upload", "notify", "end"]);
    }

    #[tokio::test]
    async fn test_missing_body_and_blank_query() {
        let tmp = tempfile::tempdir().unwrap();

        let response = app_with(tmp.path(), 1).oneshot(post_digest("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No data provided");

        let response = app_with(tmp.path(), 1)
            .oneshot(post_digest(r#"{"query": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Query is required");
    }

    #[tokio::test]
    async fn test_configuration_error_is_500() {
        let tmp = tempfile::tempdir().unwrap();
        let factory: PipelineFactory =
            Arc::new(|| Err(dg_core::Error::Configuration("SERPAPI_API_KEY is not set".to_string())));
        let app = create_app(AppState::new(factory, tmp.path(), tmp.path()));

        let response = app.oneshot(post_digest(r#"{"query": "AI"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Failed to generate digest: "));
        assert!(error.contains("SERPAPI_API_KEY"));
    }

    #[tokio::test]
    async fn test_raw_text_is_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let factory: PipelineFactory = Arc::new(move || {
            let long = article("Long read").with_raw_text("word ".repeat(200));
            Pipeline::from_services(&stub_services(vec![long], &dir))
        });
        let app = create_app(AppState::new(factory, tmp.path(), tmp.path()));

        let response = app.oneshot(post_digest(r#"{"query": "AI", "articles": 1}"#)).await.unwrap();
        let body = json_body(response).await;
        let raw = body["articles"][0]["raw_text"].as_str().unwrap();
        assert_eq!(raw.len(), 503);
        assert!(raw.ends_with("..."));
    }

    #[tokio::test]
    async fn test_download_report() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("digest.pdf"), b"%PDF-1.3 test").unwrap();

        let response = app_with(tmp.path(), 1)
            .oneshot(get("/download-report?path=digest.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"digest.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.3 test");

        let response = app_with(tmp.path(), 1).oneshot(get("/download-report")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No report path provided");

        let response = app_with(tmp.path(), 1)
            .oneshot(get("/download-report?path=.."))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid report path");

        let response = app_with(tmp.path(), 1)
            .oneshot(get("/download-report?path=missing.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Report file not found");
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let tmp = tempfile::tempdir().unwrap();

        let response = app_with(tmp.path(), 1).oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "Daily Research Digest API");

        let response = app_with(tmp.path(), 1).oneshot(get("/api/nothing-here")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_static_files_are_served() {
        let tmp = tempfile::tempdir().unwrap();
        let frontend = tmp.path().join("frontend");
        std::fs::create_dir_all(&frontend).unwrap();
        std::fs::write(frontend.join(INDEX_PAGE), "<html>digest</html>").unwrap();
        std::fs::write(frontend.join("app.js"), "console.log('hi')").unwrap();

        let response = app_with(tmp.path(), 1).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>digest</html>");

        let response = app_with(tmp.path(), 1).oneshot(get("/app.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
