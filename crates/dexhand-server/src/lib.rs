//! HTTP + WebSocket API server for the dexhand simulator.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for querying joint limits and live state,
//!   submitting one-shot joint commands, and starting/stopping named
//!   motion playback
//! - **`WebSocket` endpoint** (`/ws/state`) streaming periodic state
//!   snapshots until the client disconnects
//! - **Model endpoint** (`/model`) serving the rendered model XML
//! - **Minimal HTML status page** (`GET /`) showing uptime, joint
//!   count, live subscribers, and the endpoint list
//!
//! # Architecture
//!
//! Every handler delegates to the
//! [`Coordinator`](dexhand_core::Coordinator) in the core crate. The
//! HTTP layer itself is CRUD-shaped request/response mapping; all
//! ordering and lifecycle concerns live behind the coordinator.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
