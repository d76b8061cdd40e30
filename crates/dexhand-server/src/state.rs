//! Shared application state for the API server.
//!
//! [`AppState`] holds the coordinator plus the model source locations
//! the `/model` endpoint renders from. It is wrapped in [`Arc`] and
//! injected into handlers via Axum's `State` extractor.

use std::sync::Arc;

use dexhand_core::{Coordinator, ModelPaths};

/// Shared state for the Axum application.
#[derive(Debug)]
pub struct AppState {
    /// The concurrency coordinator owning the simulation.
    pub coordinator: Arc<Coordinator>,

    /// Filesystem locations of the model sources.
    pub model_paths: ModelPaths,
}

impl AppState {
    /// Bundle the coordinator and model locations for the router.
    pub const fn new(coordinator: Arc<Coordinator>, model_paths: ModelPaths) -> Self {
        Self {
            coordinator,
            model_paths,
        }
    }
}
