//! HTTP binding for the askflow questionnaire engine.
//!
//! Binds the transport-agnostic engine entry point to an axum router,
//! carries the ambient concerns (request trace ids, structured logging,
//! prometheus metrics), and bundles the dev-backend tooling: seeding the
//! in-memory store from a JSON graph description and recording answers.

pub mod api;
pub mod config;
pub mod seed;
pub mod telemetry;

pub use api::{router, AppState};
pub use config::ServerConfig;
