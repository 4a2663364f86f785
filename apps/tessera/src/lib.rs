//! # Tessera Application Library
//!
//! Library surface of the Tessera binary, exposed so integration tests
//! can build the router and drive the CLI plumbing without spawning a
//! process.

pub mod api;
pub mod cli;
pub mod config;
