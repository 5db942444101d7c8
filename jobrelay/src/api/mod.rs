//! REST API server module.
//!
//! Provides the agent-facing prompt endpoint, the dispatch endpoint, and
//! read-only job inspection.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
