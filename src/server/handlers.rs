// src/server/handlers.rs
// =============================================================================
// HTTP request handlers.
//
// Bodies are taken as raw bytes and decoded here so that a malformed payload
// becomes our own DecodingError (400) rather than axum's rejection format.
// Field names match what existing clients send; the capitalised spellings
// (`Links`, `Links_list`) are accepted as aliases.
// =============================================================================

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{AppError, AppState};
use crate::checker::LinkStatus;
use crate::error::Error;
use crate::registry::BatchId;
use crate::report::ReportFormat;

/// Body of POST /links
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyLinksRequest {
    #[serde(default, alias = "Links")]
    pub links: Vec<String>,
}

/// Response of POST /links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyLinksResponse {
    #[serde(alias = "Links")]
    pub links: BTreeMap<String, LinkStatus>,
    #[serde(alias = "Links_num")]
    pub links_num: BatchId,
}

/// Body of POST /links/list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinksReportRequest {
    #[serde(default, alias = "Links_list")]
    pub links_list: Vec<BatchId>,
    #[serde(default)]
    pub format: ReportFormat,
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    if body.is_empty() {
        return Err(Error::EmptyInput);
    }
    serde_json::from_slice(body).map_err(|e| Error::Decoding(e.to_string()))
}

/// POST /links - verify links and record them as a batch
pub(crate) async fn verify_links(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    if !state.is_accepting() {
        return Err(AppError::unavailable());
    }

    let request: VerifyLinksRequest = decode(&body)?;
    debug!(links = request.links.len(), "received verify request");

    let verification = state.engine.verify(&request.links).await?;

    let response = VerifyLinksResponse {
        links: verification.links,
        links_num: verification.batch_id,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// POST /links/list - render a report over earlier batches
pub(crate) async fn links_report(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    if !state.is_accepting() {
        return Err(AppError::unavailable());
    }

    let request: LinksReportRequest = decode(&body)?;
    debug!(
        batches = request.links_list.len(),
        format = ?request.format,
        "received report request"
    );

    let renderer = request.format.renderer();
    let bytes = state.engine.report(&request.links_list, renderer).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, renderer.content_type())],
        bytes,
    )
        .into_response())
}

/// GET /health - basic health check
pub(crate) async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_accepting() {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "shutting down" })),
        )
    }
}
