//! HTTP route handlers for the panel.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::{get, post};
use panel::PanelResult;
use panel::core::message::AuthorIdentity;
use panel::sync::PublishRequest;
use serde::Deserialize;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the full router, including the static report files.
pub fn router(state: AppState) -> Router {
    let report_files = ServeDir::new(state.panel.config().reports_dir());
    Router::new()
        .route("/", get(index))
        .route("/git/run", post(run_git))
        .route("/git/create-pr-with-edits", post(create_pr_with_edits))
        .route("/git/diff", get(diff))
        .route("/git/bean-query", post(bean_query))
        .route("/git/hbl", get(list_reports))
        .route("/git/fetch-latest-hbl", get(fetch_latest))
        .route("/git/fetch-hbl-report", get(fetch_report))
        .nest_service("/git/hbl/files", report_files)
        .with_state(state)
}

/// Run a blocking panel operation off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> PanelResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

/// GET / - control page.
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    state
        .pages
        .index(state.panel.config())
        .map(Html)
        .map_err(|e| ApiError::internal(format!("render failed: {e:#}")))
}

#[derive(Deserialize)]
struct RunRequest {
    command: Vec<String>,
}

/// POST /git/run - whitelisted git passthrough.
async fn run_git(State(state): State<AppState>, body: Bytes) -> Result<String, ApiError> {
    let request: RunRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting git run body");
        ApiError::bad_request("Invalid request")
    })?;
    let panel = state.panel.clone();
    blocking(move || panel.run_git(&request.command)).await
}

#[derive(Deserialize)]
struct PublishParams {
    commit_msg: Option<String>,
}

/// POST /git/create-pr-with-edits - commit the ledger and open or reuse a PR.
async fn create_pr_with_edits(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
    headers: HeaderMap,
) -> Result<String, ApiError> {
    let author = author_from_headers(&headers, &state.panel.config().author_header)?;
    let request = PublishRequest {
        message: params.commit_msg,
        author,
    };
    let panel = state.panel.clone();
    let outcome = blocking(move || panel.publish(&request)).await?;
    Ok(outcome.to_string())
}

fn author_from_headers(headers: &HeaderMap, name: &str) -> Result<Option<AuthorIdentity>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let email = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Invalid author header"))?
        .trim();
    if email.is_empty() {
        return Ok(None);
    }
    Ok(Some(AuthorIdentity::from_email(email)?))
}

/// GET /git/diff - unstaged changes.
async fn diff(State(state): State<AppState>) -> Result<String, ApiError> {
    let panel = state.panel.clone();
    blocking(move || panel.diff()).await
}

/// POST /git/bean-query - plain-text ledger query.
async fn bean_query(State(state): State<AppState>, body: String) -> Result<String, ApiError> {
    let panel = state.panel.clone();
    blocking(move || panel.query(&body)).await
}

/// GET /git/hbl - downloaded statement reports.
async fn list_reports(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let panel = state.panel.clone();
    let reports = blocking(move || panel.reports()).await?;
    state
        .pages
        .reports(&reports)
        .map(Html)
        .map_err(|e| ApiError::internal(format!("render failed: {e:#}")))
}

/// GET /git/fetch-latest-hbl - download from the newest report up to today.
async fn fetch_latest(State(state): State<AppState>) -> Result<String, ApiError> {
    let today = chrono::Local::now().date_naive();
    let panel = state.panel.clone();
    blocking(move || panel.fetch_latest_reports(today)).await
}

#[derive(Deserialize)]
struct ReportParams {
    #[serde(default)]
    date: String,
}

/// GET /git/fetch-hbl-report?date=YYYY-MM-DD - download a single day.
async fn fetch_report(
    State(state): State<AppState>,
    Query(params): Query<ReportParams>,
) -> Result<String, ApiError> {
    let panel = state.panel.clone();
    blocking(move || panel.fetch_report(&params.date)).await
}
