//! HTTP route handlers for the citation validator API.

use crate::models::{IndexSourceRequest, IndexSourceResponse, ValidateRequest};
use crate::store::{load_fresh_report, load_report, new_report, save_report};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

// ============================================================================
// Validation Handlers
// ============================================================================

/// POST /api/citations/validate - validate every citation of a manuscript
///
/// Reuses the stored report while the manuscript text is unchanged, unless
/// `force` is set.
pub async fn validate_citations(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> Response {
    let file_tag = req.file_tag.trim();
    if file_tag.is_empty() {
        return (StatusCode::BAD_REQUEST, "file_tag is required").into_response();
    }

    if !req.force {
        if let Some(cached) = load_fresh_report(&state.db, file_tag, &req.text) {
            tracing::info!(file_tag, "returning cached validation report");
            return Json(cached).into_response();
        }
    }

    let citations = state.validator.validate_all(&req.text, file_tag).await;
    let report = new_report(file_tag, &req.text, citations);
    if let Err(e) = save_report(&state.db, &report) {
        tracing::warn!(file_tag, error = %e, "could not cache validation report");
    }
    Json(report).into_response()
}

/// GET /api/citations/{file_tag} - last stored report
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(file_tag): Path<String>,
) -> Response {
    match load_report(&state.db, &file_tag) {
        Some(report) => Json(report).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("No validation report for {}", file_tag),
        )
            .into_response(),
    }
}

// ============================================================================
// Alternative Source Index
// ============================================================================

/// POST /api/sources - embed a paper title and add it to the index used for
/// alternative-source suggestions
pub async fn index_source(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndexSourceRequest>,
) -> Response {
    let title = req.title.trim();
    if title.is_empty() {
        return index_error(StatusCode::BAD_REQUEST, "Title is required".to_string());
    }

    let embedding = match state.embedder.embed(&[title.to_string()]).await {
        Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
        Ok(_) => {
            return index_error(StatusCode::BAD_GATEWAY, "Empty embedding response".to_string())
        }
        Err(e) => return index_error(StatusCode::BAD_GATEWAY, e.to_string()),
    };

    let arxiv_id = req.arxiv_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
    if let Err(e) = state.sources.insert(title, arxiv_id, embedding) {
        return index_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    tracing::info!(title, arxiv_id = ?arxiv_id, indexed = state.sources.len(), "indexed alternative source");
    Json(IndexSourceResponse {
        success: true,
        error: None,
    })
    .into_response()
}

fn index_error(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(IndexSourceResponse {
            success: false,
            error: Some(error),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
