//! nbk-daemon library target.
//!
//! Exposes the router, state and extractor adapters for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod error;
pub mod extractor;
pub mod routes;
pub mod state;
