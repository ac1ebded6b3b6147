//! HTTP API module.
//!
//! This module provides the HTTP server, its request/response types and the
//! log broadcaster shared with the CLI.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
