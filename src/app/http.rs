use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::routing::{get, post};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::app::log_store::{GenerationLog, Stats};
use crate::app::runner::{BatchReport, RunError, SiteRunner};
use crate::model::{GenerationRequest, Style};

pub const DEFAULT_LOG_LIMIT: usize = 50;
pub const MAX_LOG_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SiteRunner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/generate", post(generate))
        .route("/sites/:site_id", get(site_page))
        .route("/site/:site_id", get(site_page))
        .route("/logs", get(logs))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire form of a generation request; omitted fields take their defaults.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub topic: String,
    pub pages_count: Option<u32>,
    pub style: Option<String>,
    pub max_tokens: Option<u32>,
}

impl GenerateBody {
    pub fn into_request(self) -> Result<GenerationRequest, crate::error::ValidationError> {
        let style = match self.style.as_deref() {
            Some(raw) => raw.parse::<Style>()?,
            None => GenerationRequest::default_style(),
        };
        GenerationRequest::new(
            self.topic,
            self.pages_count.unwrap_or_else(GenerationRequest::default_pages_count),
            style,
            self.max_tokens.unwrap_or_else(GenerationRequest::default_max_tokens),
        )
    }
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let html = state.runner.renderer().render_index().map_err(|err| {
        tracing::error!(?err, "render index");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Html(html))
}

async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<BatchReport>, (StatusCode, String)> {
    let request = body
        .into_request()
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;

    match state.runner.run(request).await {
        Ok(report) => Ok(Json(report)),
        Err(RunError::Validation(err)) => Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string())),
        Err(RunError::Internal(err)) => {
            tracing::error!(?err, "generation failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("generation failed: {err:#}"),
            ))
        }
    }
}

async fn site_page(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    if uuid::Uuid::parse_str(site_id.trim()).is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let Some(record) = state
        .runner
        .log_store()
        .site(site_id.trim())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    else {
        return Err(StatusCode::NOT_FOUND);
    };

    let html = tokio::fs::read_to_string(&record.file_path)
        .await
        .map_err(|err| {
            tracing::warn!(
                %site_id,
                path = %record.file_path.display(),
                %err,
                "site file unreadable"
            );
            StatusCode::NOT_FOUND
        })?;
    Ok(Html(html))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn logs(
    State(state): State<AppState>,
    Query(q): Query<LogsQuery>,
) -> Result<Json<Vec<GenerationLog>>, StatusCode> {
    let limit = q.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let offset = q.offset.unwrap_or(0);
    let history = state
        .runner
        .log_store()
        .history(offset, limit)
        .await
        .map_err(|err| {
            tracing::error!(?err, "read history");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(history))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, StatusCode> {
    let stats = state.runner.log_store().stats().await.map_err(|err| {
        tracing::error!(?err, "read stats");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(stats))
}
