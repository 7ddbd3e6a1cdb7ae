//! HTTP front end: `GET /search?q=<query>[&k=<n>][&mode=tfidf|bm25]`
//! returns the matching document keys as a JSON array

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::{
    error::Error,
    search::{SearchEngine, Scoring},
};

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    pub mode: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

/// Error wrapper for handlers
pub enum ApiError {
    Search(Error),
    BadRequest(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Search(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Search(e) => {
                error!("Search failed: {}", e);
                let error_type = match &e {
                    Error::NotFound(_) => "not_found",
                    Error::MalformedIndex(_) => "malformed_index",
                    Error::Io(_) => "io_error",
                    Error::OrderingViolation(_) => "ordering_violation",
                    Error::Serialization(_) => "serialization_error",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, error_type, e.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_type,
                message,
            }),
        )
            .into_response()
    }
}

fn parse_mode(mode: Option<&str>) -> Result<Scoring, ApiError> {
    match mode {
        None | Some("tfidf") => Ok(Scoring::TfIdf),
        Some("bm25") => Ok(Scoring::bm25()),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown scoring mode {} (expected tfidf or bm25)",
            other
        ))),
    }
}

async fn welcome() -> Html<&'static str> {
    Html("<h1>BSBI search</h1><p>Query with <code>/search?q=...</code></p>")
}

async fn search(
    State(engine): State<Arc<SearchEngine>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let scoring = parse_mode(params.mode.as_deref())?;
    let k = params.k.unwrap_or(DEFAULT_TOP_K);
    info!("Query {:?} (k={}, {})", params.q, k, scoring.name());

    // Postings are read synchronously
    let results = tokio::task::spawn_blocking(move || engine.retrieve(&params.q, k, &scoring))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(results.into_iter().map(|r| r.document).collect()))
}

pub fn create_router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/search", get(search))
        .with_state(engine)
        .layer(CorsLayer::permissive())
}

/// Serves until the process is stopped
pub async fn serve(engine: Arc<SearchEngine>, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(engine)).await
}
