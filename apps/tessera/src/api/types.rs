//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::{CollectionSchema, Value};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub triple_count: usize,
    pub entity_count: usize,
    pub collections: Vec<String>,
    pub persistent: bool,
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            triple_count: 0,
            entity_count: 0,
            collections: vec![],
            persistent: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// SCHEMA REQUEST/RESPONSE
// =============================================================================

/// Declare (or replace) one collection schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub collection: String,
    pub schema: CollectionSchema,
}

/// Schema declaration response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub success: bool,
    pub collections: Vec<String>,
    pub error: Option<String>,
}

impl SchemaResponse {
    pub fn success(collections: Vec<String>) -> Self {
        Self {
            success: true,
            collections,
            error: None,
        }
    }
}

// =============================================================================
// DOCUMENT REQUEST/RESPONSE
// =============================================================================

/// Document insert request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub collection: String,
    pub id: String,
    pub document: Value,
}

/// Document insert response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub key: Option<String>,
    pub triples: Option<usize>,
    pub error: Option<String>,
}

impl DocumentResponse {
    pub fn success(key: String, triples: usize) -> Self {
        Self {
            success: true,
            key: Some(key),
            triples: Some(triples),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            key: None,
            triples: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// FETCH REQUEST/RESPONSE
// =============================================================================

/// Fetch request.
///
/// With an `id`, fetches one document; without, every visible member of
/// the collection. `variables` are query-scoped bindings that shadow the
/// server session's connection-scoped ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub collection: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// Fetch response.
///
/// `outcome` distinguishes `found`, `absent`, and `redacted` for single
/// fetches, and is `collection` for collection-wide fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub entity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub entities: Option<BTreeMap<String, Value>>,
    pub error: Option<String>,
}

impl FetchResponse {
    pub fn found(entity: Value) -> Self {
        Self {
            success: true,
            outcome: "found".to_string(),
            entity: Some(entity),
            entities: None,
            error: None,
        }
    }

    pub fn absent() -> Self {
        Self {
            success: true,
            outcome: "absent".to_string(),
            entity: None,
            entities: None,
            error: None,
        }
    }

    pub fn redacted() -> Self {
        Self {
            success: true,
            outcome: "redacted".to_string(),
            entity: None,
            entities: None,
            error: None,
        }
    }

    pub fn collection(entities: BTreeMap<String, Value>) -> Self {
        Self {
            success: true,
            outcome: "collection".to_string(),
            entity: None,
            entities: Some(entities),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome: "error".to_string(),
            entity: None,
            entities: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// RETRACT REQUEST/RESPONSE
// =============================================================================

/// Document retraction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractRequest {
    pub collection: String,
    pub id: String,
}

/// Document retraction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractResponse {
    pub success: bool,
    pub tombstones: Option<usize>,
    pub error: Option<String>,
}

impl RetractResponse {
    pub fn success(tombstones: usize) -> Self {
        Self {
            success: true,
            tombstones: Some(tombstones),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            tombstones: None,
            error: Some(msg.into()),
        }
    }
}
