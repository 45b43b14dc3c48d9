use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::dashboard::{Viewer, ViewerCursor};
use crate::db::{Database, NewsRecord, NewsSubmission};

pub const API_KEY_HEADER: &str = "X-API-Key";

pub struct AppState {
    pub db: Arc<Database>,
    pub api_key: String,
    pub dashboard_refresh_secs: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/news", post(add_news))
        .route("/news/feed", get(news_feed))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub refresh_secs: u64,
}

#[derive(Template)]
#[template(path = "news_feed.html")]
pub struct NewsFeedTemplate {
    pub records: Vec<NewsRecord>,
    pub new_content: bool,
    pub cursor: i64,
    pub refresh_secs: u64,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

/// Failures of the ingestion endpoint; each maps to its own status code.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not validate credentials")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::Unauthorized => StatusCode::FORBIDDEN,
            IngestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Internal(e) => {
                error!("Failed to store news: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

fn authorize(headers: &HeaderMap, expected: &str) -> Result<(), IngestError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || provided != expected {
        return Err(IngestError::Unauthorized);
    }
    Ok(())
}

fn validate(news: &NewsSubmission) -> Result<(), IngestError> {
    if news.title.trim().is_empty() {
        return Err(IngestError::Validation("title must not be empty".to_string()));
    }
    if news.trading_decision.trim().is_empty() {
        return Err(IngestError::Validation(
            "trading_decision must not be empty".to_string(),
        ));
    }
    Ok(())
}

// Route handlers
pub async fn add_news(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewsSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, IngestError> {
    if let Err(e) = authorize(&headers, &state.api_key) {
        warn!("Rejected news submission with invalid API key");
        return Err(e);
    }

    let Json(news) = payload.map_err(|rejection| IngestError::Validation(rejection.body_text()))?;
    validate(&news)?;

    let id = state.db.append(&news).await?;
    info!(id, title = %news.title, "News added");

    Ok(Json(json!({ "message": "News added successfully" })))
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    HtmlTemplate(IndexTemplate {
        refresh_secs: state.dashboard_refresh_secs,
    })
}

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub cursor: i64,
}

pub async fn news_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut viewer = Viewer::resume(ViewerCursor::resume(query.cursor));
    let tick = viewer.poll(&state.db).await?;

    Ok(HtmlTemplate(NewsFeedTemplate {
        records: tick.records,
        new_content: tick.new_content,
        cursor: viewer.cursor().get(),
        refresh_secs: state.dashboard_refresh_secs,
    }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
