//! Command implementations for the CLI
//!
//! - start: Start the HTTP server
//! - test: Test configuration validity
//! - config: Configuration display and validation
//! - search: Query stored log entries

pub mod config;
pub mod search;
pub mod start;
