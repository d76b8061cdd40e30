//! Axum router construction for the simulator API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin viewer access.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the simulator server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /model` -- rendered model XML
/// - `GET /joints` -- joint-limit table
/// - `POST /joints/command` -- one-shot joint command
/// - `GET /state` -- live snapshot
/// - `GET /motions` -- motion name list
/// - `POST /motions/play` -- start playback
/// - `POST /motions/stop` -- cancel playback
/// - `GET /ws/state` -- `WebSocket` state stream
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Model document
        .route("/model", get(handlers::get_model))
        // REST API
        .route("/joints", get(handlers::get_limits))
        .route("/joints/command", post(handlers::command_joints))
        .route("/state", get(handlers::get_state))
        .route("/motions", get(handlers::list_motions))
        .route("/motions/play", post(handlers::play_motion))
        .route("/motions/stop", post(handlers::stop_motion))
        // WebSocket
        .route("/ws/state", get(ws::ws_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
