//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        DocumentRequest, DocumentResponse, FetchRequest, FetchResponse, HealthResponse,
        RetractRequest, RetractResponse, SchemaRequest, SchemaResponse, StatusResponse,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tessera_core::{ReadOutcome, TesseraError};

/// Map a core error to an HTTP status.
///
/// Caller mistakes (bad ids, bad documents, unbound variables) are 400;
/// key corruption and storage failures are 500.
fn error_status(error: &TesseraError) -> StatusCode {
    match error {
        TesseraError::InvalidEntityId { .. }
        | TesseraError::EmptyPathInsertion { .. }
        | TesseraError::SessionVariableNotFound(_)
        | TesseraError::DocumentTooDeep => StatusCode::BAD_REQUEST,
        TesseraError::MalformedInternalId(_)
        | TesseraError::SerializationError(_)
        | TesseraError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get store status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let counts = session
        .triple_count()
        .and_then(|triples| session.entity_count().map(|entities| (triples, entities)));
    match counts {
        Ok((triple_count, entity_count)) => {
            let response = StatusResponse {
                success: true,
                triple_count,
                entity_count,
                collections: session
                    .schemas()
                    .collections()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                persistent: session.is_persistent(),
                error: None,
            };
            (StatusCode::OK, Json(response))
        }
        Err(e) => (
            error_status(&e),
            Json(StatusResponse::error(format!("Status failed: {}", e))),
        ),
    }
}

// =============================================================================
// SCHEMA HANDLER
// =============================================================================

/// Declare a collection schema.
pub async fn schema_handler(
    State(state): State<AppState>,
    Json(request): Json<SchemaRequest>,
) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.define_collection(request.collection, request.schema);

    let collections = session
        .schemas()
        .collections()
        .iter()
        .map(ToString::to_string)
        .collect();
    (StatusCode::OK, Json(SchemaResponse::success(collections)))
}

// =============================================================================
// DOCUMENT HANDLER
// =============================================================================

/// Insert a document.
pub async fn document_handler(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> impl IntoResponse {
    let mut session = state.session.write().await;
    match session.insert(&request.collection, &request.id, &request.document) {
        Ok((key, rows)) => (
            StatusCode::OK,
            Json(DocumentResponse::success(key, rows.len())),
        ),
        Err(e) => (
            error_status(&e),
            Json(DocumentResponse::error(format!("Insert failed: {}", e))),
        ),
    }
}

// =============================================================================
// FETCH HANDLER
// =============================================================================

/// Fetch one document, or every visible member of a collection.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> impl IntoResponse {
    let session = state.session.read().await;

    match &request.id {
        Some(id) => match session.fetch(&request.collection, id, &request.variables) {
            Ok(ReadOutcome::Visible(Some(entity))) => {
                (StatusCode::OK, Json(FetchResponse::found(entity)))
            }
            Ok(ReadOutcome::Visible(None)) => (StatusCode::OK, Json(FetchResponse::absent())),
            Ok(ReadOutcome::Redacted) => (StatusCode::OK, Json(FetchResponse::redacted())),
            Err(e) => (
                error_status(&e),
                Json(FetchResponse::error(format!("Fetch failed: {}", e))),
            ),
        },
        None => match session.fetch_collection(&request.collection, &request.variables) {
            Ok(entities) => (StatusCode::OK, Json(FetchResponse::collection(entities))),
            Err(e) => (
                error_status(&e),
                Json(FetchResponse::error(format!("Fetch failed: {}", e))),
            ),
        },
    }
}

// =============================================================================
// RETRACT HANDLER
// =============================================================================

/// Tombstone every live attribute of a document.
pub async fn retract_handler(
    State(state): State<AppState>,
    Json(request): Json<RetractRequest>,
) -> impl IntoResponse {
    let mut session = state.session.write().await;
    match session.retract(&request.collection, &request.id) {
        Ok(tombstones) => (StatusCode::OK, Json(RetractResponse::success(tombstones))),
        Err(e) => (
            error_status(&e),
            Json(RetractResponse::error(format!("Retract failed: {}", e))),
        ),
    }
}
