//! HTTP surface: `GET /{owner}/{repo}` returns the repository as Markdown.
//!
//! Only the first two path segments count, so `/{owner}/{repo}/tree/main` is the same
//! request. Errors are JSON `{"error": "..."}` with the status derived from the message.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::header::{
    HeaderName, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
    X_XSS_PROTECTION,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use gittomd_core::convert::{Converter, MISSING_IDENTIFIERS};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");
const MARKDOWN_CACHE_CONTROL: &str =
    "public, s-maxage=600, max-age=300, stale-while-revalidate=1800, stale-if-error=3600";

#[derive(Deserialize)]
struct RepoPath {
    owner: String,
    repo: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub fn router(converter: Arc<Converter>) -> Router {
    Router::new()
        .route("/:owner/:repo", get(convert_repository))
        .route("/:owner/:repo/*rest", get(convert_repository))
        .fallback(missing_identifiers)
        .with_state(converter)
}

/// Bind `bind` and serve until ctrl-c.
pub async fn serve(converter: Arc<Converter>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "Serving repository conversions");

    axum::serve(listener, router(converter))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "Failed to listen for shutdown signal");
    }
}

async fn convert_repository(
    State(converter): State<Arc<Converter>>,
    Path(RepoPath { owner, repo }): Path<RepoPath>,
) -> Response {
    info!(owner = %owner, repo = %repo, "Conversion requested");
    match converter.convert(&owner, &repo).await {
        // A started cache write is left to finish on its own.
        Ok(outcome) => {
            info!(owner = %owner, repo = %repo, origin = ?outcome.origin, "Conversion served");
            markdown_response(outcome.markdown)
        }
        Err(e) => {
            let status = e.status();
            error!(owner = %owner, repo = %repo, status, error = %e, "Conversion failed");
            error_response(status, &e.to_string())
        }
    }
}

async fn missing_identifiers() -> Response {
    error_response(StatusCode::BAD_REQUEST.as_u16(), MISSING_IDENTIFIERS)
}

fn markdown_response(markdown: String) -> Response {
    (
        [
            (CONTENT_TYPE, "text/markdown; charset=utf-8"),
            (CACHE_CONTROL, MARKDOWN_CACHE_CONTROL),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (X_FRAME_OPTIONS, "DENY"),
            (X_XSS_PROTECTION, "1; mode=block"),
            (X_ROBOTS_TAG, "noindex, nofollow"),
        ],
        markdown,
    )
        .into_response()
}

fn error_response(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::to_string(&ErrorBody { error: message })
        .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string());
    (
        status,
        [
            (CONTENT_TYPE, "application/json; charset=utf-8"),
            (X_ROBOTS_TAG, "noindex, nofollow"),
        ],
        body,
    )
        .into_response()
}
