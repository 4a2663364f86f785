//! # Persistent Storage
//!
//! Disk-backed triple log implementations.

mod redb_log;

pub use redb_log::RedbLog;
