//! # Server Configuration
//!
//! Optional TOML configuration for the `server` command. Every field is
//! optional; CLI flags win over file values, file values win over the
//! built-in defaults.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 9000
//! database = "/var/lib/tessera/tessera.redb"
//! backend = "redb"
//! schema = "/etc/tessera/schema.json"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tessera_core::TesseraError;

/// Parsed server configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: Option<String>,
    /// Port to bind to.
    pub port: Option<u16>,
    /// Path to the triple log database.
    pub database: Option<PathBuf>,
    /// Storage backend: "memory" or "redb".
    pub backend: Option<String>,
    /// Path to a JSON schema file applied at startup.
    pub schema: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TesseraError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TesseraError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            TesseraError::SerializationError(format!(
                "Invalid config '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
host = "0.0.0.0"
port = 9000
database = "/tmp/t.redb"
backend = "redb"
schema = "/tmp/schema.json"
"#
        )
        .expect("write");

        let config = ServerConfig::load(file.path()).expect("load");
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.backend.as_deref(), Some("redb"));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let config = ServerConfig::load(file.path()).expect("load");
        assert!(config.host.is_none());
        assert!(config.port.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "hots = \"typo\"").expect("write");
        assert!(ServerConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/tessera.toml"));
        assert!(matches!(err, Err(TesseraError::IoError(_))));
    }
}
