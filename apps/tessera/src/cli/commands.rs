//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::ServerConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tessera_core::{CollectionSchema, ReadOutcome, Session, TesseraError, Value};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for documents and schemas (16 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_INPUT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TesseraError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TesseraError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TesseraError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", ensures it exists
/// and is a regular file. Prevents path traversal through CLI arguments.
fn validate_file_path(path: &Path) -> Result<PathBuf, TesseraError> {
    let canonical = path.canonicalize().map_err(|e| {
        TesseraError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TesseraError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read and parse a JSON file within the size limit.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TesseraError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INPUT_FILE_SIZE)?;
    let contents = std::fs::read(&validated)
        .map_err(|e| TesseraError::IoError(format!("Read file: {}", e)))?;
    serde_json::from_slice(&contents).map_err(|e| {
        TesseraError::SerializationError(format!("Invalid JSON in '{}': {}", path.display(), e))
    })
}

// =============================================================================
// SESSION HELPERS
// =============================================================================

/// Load or create a session for the given backend, applying a schema file
/// when one is supplied.
pub fn load_session(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
) -> Result<Session, TesseraError> {
    let mut session = match backend {
        "memory" => Session::new(),
        "redb" => Session::with_redb(db_path)?,
        other => {
            return Err(TesseraError::SerializationError(format!(
                "Unknown backend: {}. Use: memory, redb",
                other
            )));
        }
    };

    if let Some(path) = schema {
        apply_schema_file(&mut session, path)?;
    }

    Ok(session)
}

/// Declare every collection from a JSON schema file on a session.
///
/// The file is a JSON object mapping collection names to schemas:
/// `{"notes": {"attributes": {...}, "rules": {"read": [...]}}}`.
pub fn apply_schema_file(session: &mut Session, path: &Path) -> Result<usize, TesseraError> {
    let schemas: BTreeMap<String, CollectionSchema> = read_json_file(path)?;
    let count = schemas.len();
    for (collection, schema) in schemas {
        session.define_collection(collection, schema);
    }
    Ok(count)
}

/// Parse repeated `name=value` variable bindings.
///
/// The value is parsed as JSON first, so `--var age=30` binds an integer
/// and `--var active=true` a boolean; anything unparseable binds as a
/// plain string.
pub fn parse_vars(pairs: &[String]) -> Result<BTreeMap<String, Value>, TesseraError> {
    let mut vars = BTreeMap::new();
    for pair in pairs {
        let Some((name, raw)) = pair.split_once('=') else {
            return Err(TesseraError::SerializationError(format!(
                "Invalid variable binding '{}': expected name=value",
                pair
            )));
        };
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::from(raw.to_string()));
        vars.insert(name.to_string(), value);
    }
    Ok(vars)
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
    host: Option<&str>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<(), TesseraError> {
    let config = match config_path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    // CLI flags win over the config file, which wins over defaults
    let host = host
        .map(ToString::to_string)
        .or(config.host)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = port.or(config.port).unwrap_or(8080);
    let db_path = config.database.as_deref().unwrap_or(db_path);
    let backend = config.backend.as_deref().unwrap_or(backend);
    let schema = schema.or(config.schema.as_deref());

    let session = load_session(db_path, backend, schema)?;

    println!("Tessera Document Store Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET  /health   - Health check");
    println!("  GET  /status   - Store status");
    println!("  POST /schema   - Declare a collection schema");
    println!("  POST /document - Insert a document");
    println!("  POST /fetch    - Fetch through the read-rule gate");
    println!("  POST /retract  - Tombstone a document");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, session).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store status.
pub fn cmd_status(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
    json_mode: bool,
) -> Result<(), TesseraError> {
    let session = load_session(db_path, backend, schema)?;
    let triple_count = session.triple_count()?;
    let entity_count = session.entity_count()?;
    let collections: Vec<String> = session
        .schemas()
        .collections()
        .iter()
        .map(ToString::to_string)
        .collect();

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "triple_count": triple_count,
            "entity_count": entity_count,
            "collections": collections
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Tessera Store Status");
    println!("====================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Triples:  {}", triple_count);
    println!("Entities: {}", entity_count);
    if collections.is_empty() {
        println!("Schemas:  (none declared)");
    } else {
        println!("Schemas:  {}", collections.join(", "));
    }

    Ok(())
}

// =============================================================================
// DEFINE COMMAND
// =============================================================================

/// Declare collection schemas from a JSON file.
///
/// Schemas are session state: this validates the file and reports what it
/// declares. The server and the read commands take the same file via
/// `--schema` so the declarations are in force for their session.
pub fn cmd_define(
    db_path: &Path,
    backend: &str,
    file: &Path,
    json_mode: bool,
) -> Result<(), TesseraError> {
    let mut session = load_session(db_path, backend, None)?;
    let count = apply_schema_file(&mut session, file)?;

    let collections: Vec<String> = session
        .schemas()
        .collections()
        .iter()
        .map(ToString::to_string)
        .collect();

    if json_mode {
        let output = serde_json::json!({
            "declared": count,
            "collections": collections
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Declared {} collection schema(s):", count);
    for name in collections {
        println!("  {}", name);
    }

    Ok(())
}

// =============================================================================
// INSERT COMMAND
// =============================================================================

/// Insert a document into a collection.
pub fn cmd_insert(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
    collection: &str,
    id: &str,
    document: Option<&str>,
    file: Option<&Path>,
    json_mode: bool,
) -> Result<(), TesseraError> {
    let document: Value = match (document, file) {
        (Some(inline), None) => serde_json::from_str(inline)
            .map_err(|e| TesseraError::SerializationError(format!("Invalid JSON: {}", e)))?,
        (None, Some(path)) => read_json_file(path)?,
        _ => {
            return Err(TesseraError::SerializationError(
                "Provide the document as inline JSON or via --file".to_string(),
            ));
        }
    };

    let mut session = load_session(db_path, backend, schema)?;
    let (key, rows) = session.insert(collection, id, &document)?;

    if json_mode {
        let output = serde_json::json!({
            "key": key,
            "triples": rows.len()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Inserted {} ({} triples)", key, rows.len());
    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// Fetch documents through the read-rule gate.
pub fn cmd_get(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
    collection: &str,
    id: Option<&str>,
    vars: &[String],
    json_mode: bool,
) -> Result<(), TesseraError> {
    let session = load_session(db_path, backend, schema)?;
    let query_vars = parse_vars(vars)?;

    match id {
        Some(id) => {
            let outcome = session.fetch(collection, id, &query_vars)?;
            match outcome {
                ReadOutcome::Visible(Some(entity)) => {
                    let rendered = serde_json::to_string_pretty(&entity)
                        .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
                    println!("{}", rendered);
                }
                ReadOutcome::Visible(None) => {
                    if json_mode {
                        println!("null");
                    } else {
                        println!("Not found: {}#{}", collection, id);
                    }
                }
                ReadOutcome::Redacted => {
                    if json_mode {
                        println!("null");
                    } else {
                        println!("Redacted: {}#{}", collection, id);
                    }
                }
            }
        }
        None => {
            let visible = session.fetch_collection(collection, &query_vars)?;
            if json_mode {
                let rendered = serde_json::to_string_pretty(&visible)
                    .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
                println!("{}", rendered);
            } else if visible.is_empty() {
                println!("No visible documents in '{}'", collection);
            } else {
                for (id, entity) in &visible {
                    let line = serde_json::to_string(entity)
                        .map_err(|e| TesseraError::SerializationError(e.to_string()))?;
                    println!("{}  {}", id, line);
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// RETRACT COMMAND
// =============================================================================

/// Tombstone every live attribute of a document.
pub fn cmd_retract(
    db_path: &Path,
    backend: &str,
    schema: Option<&Path>,
    collection: &str,
    id: &str,
    json_mode: bool,
) -> Result<(), TesseraError> {
    let mut session = load_session(db_path, backend, schema)?;
    let tombstones = session.retract(collection, id)?;

    if json_mode {
        let output = serde_json::json!({ "tombstones": tombstones });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if tombstones == 0 {
        println!("Nothing to retract: {}#{}", collection, id);
    } else {
        println!(
            "Retracted {}#{} ({} tombstones)",
            collection, id, tombstones
        );
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &Path, backend: &str, force: bool) -> Result<(), TesseraError> {
    if db_path.exists() && !force {
        return Err(TesseraError::SerializationError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match backend {
        "redb" => {
            if force && db_path.exists() {
                std::fs::remove_file(db_path)
                    .map_err(|e| TesseraError::IoError(format!("Remove db: {}", e)))?;
            }
            let _session = Session::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
            Ok(())
        }
        "memory" => Err(TesseraError::SerializationError(
            "The memory backend has nothing to initialize".to_string(),
        )),
        other => Err(TesseraError::SerializationError(format!(
            "Unknown backend: {}. Use: memory, redb",
            other
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
