//! REST API endpoint handlers for the simulator server.
//!
//! All handlers delegate to the shared
//! [`Coordinator`](dexhand_core::Coordinator) via [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/model` | Rendered model XML (`?source=auto\|sample\|precompiled`) |
//! | `GET` | `/joints` | Joint-limit table |
//! | `POST` | `/joints/command` | Apply a one-shot joint command |
//! | `GET` | `/state` | Live joint-position snapshot |
//! | `GET` | `/motions` | List available motion names |
//! | `POST` | `/motions/play` | Start a named motion playback run |
//! | `POST` | `/motions/stop` | Cancel a live playback run |

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use dexhand_core::{render_model, JointCommand, ModelSourceKind};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / query structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /model` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct ModelQuery {
    /// Which source to render. Defaults to `auto`.
    pub source: Option<ModelSourceKind>,
}

/// Request body for `POST /motions/play`.
#[derive(Debug, serde::Deserialize)]
pub struct MotionRequest {
    /// Name of the motion to play.
    pub name: String,

    /// Duration scale factor applied to every keyframe offset.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

const fn default_scale() -> f64 {
    1.0
}

/// Request body for `POST /motions/stop`.
#[derive(Debug, serde::Deserialize)]
pub struct StopRequest {
    /// Id returned by `POST /motions/play`.
    pub run_id: Uuid,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let coordinator = &state.coordinator;
    let uptime = chrono::Utc::now()
        .signed_duration_since(coordinator.started_at())
        .num_seconds()
        .max(0);
    let joint_count = coordinator.joint_count();
    let subscriber_count = coordinator.subscriber_count().await;
    let active_runs = coordinator.active_runs().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Dexhand Simulator</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Dexhand Simulator</h1>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Uptime (s)</div>
            <div class="value">{uptime}</div>
        </div>
        <div class="metric">
            <div class="label">Joints</div>
            <div class="value">{joint_count}</div>
        </div>
        <div class="metric">
            <div class="label">Subscribers</div>
            <div class="value">{subscriber_count}</div>
        </div>
        <div class="metric">
            <div class="label">Motions playing</div>
            <div class="value">{active_runs}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/model">/model</a> -- Rendered model XML (?source=auto|sample|precompiled)</li>
        <li>GET <a href="/joints">/joints</a> -- Joint-limit table</li>
        <li>POST /joints/command -- Apply a one-shot joint command</li>
        <li>GET <a href="/state">/state</a> -- Live joint-position snapshot</li>
        <li>GET <a href="/motions">/motions</a> -- List available motions</li>
        <li>POST /motions/play -- Start a named motion</li>
        <li>POST /motions/stop -- Cancel a playback run</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/state</code> -- Live state snapshot stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /model -- rendered model XML
// ---------------------------------------------------------------------------

/// Render and return the model document for the requested source.
///
/// # Query Parameters
///
/// - `source`: `auto` | `sample` | `precompiled` (default: `auto`)
pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = params.source.unwrap_or(ModelSourceKind::Auto);
    let document = render_model(kind, &state.model_paths, state.coordinator.limits())?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], document))
}

// ---------------------------------------------------------------------------
// GET /joints -- joint-limit table
// ---------------------------------------------------------------------------

/// Return the joint-limit table loaded at startup.
pub async fn get_limits(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.limits().clone())
}

// ---------------------------------------------------------------------------
// GET /state -- live snapshot
// ---------------------------------------------------------------------------

/// Return a fresh snapshot of every joint position.
///
/// Waits for one serializer turn; this is the only endpoint that can
/// briefly queue behind in-flight simulation work.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.snapshot().await)
}

// ---------------------------------------------------------------------------
// POST /joints/command -- one-shot joint command
// ---------------------------------------------------------------------------

/// Apply a one-shot joint command and schedule one simulation step.
///
/// Unknown joint names in the payload are silently ignored; a
/// malformed payload (non-finite targets, non-positive force) is
/// rejected with 400 before anything reaches the simulation.
pub async fn command_joints(
    State(state): State<Arc<AppState>>,
    Json(command): Json<JointCommand>,
) -> Result<impl IntoResponse, ApiError> {
    state.coordinator.submit_command(command).await?;
    Ok(Json(serde_json::json!({ "status": "queued" })))
}

// ---------------------------------------------------------------------------
// GET /motions -- motion name list
// ---------------------------------------------------------------------------

/// List the available motion names, sorted.
pub async fn list_motions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let names = state.coordinator.motion_names()?;
    Ok(Json(names))
}

// ---------------------------------------------------------------------------
// POST /motions/play -- start playback
// ---------------------------------------------------------------------------

/// Start an independent playback run of a named motion.
///
/// The motion is validated before any task is scheduled: an unknown
/// name returns 404 and a non-positive scale 400, both with no
/// simulation side effect.
pub async fn play_motion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MotionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let run_id = state
        .coordinator
        .start_motion(&request.name, request.scale)
        .await?;
    Ok(Json(serde_json::json!({
        "status": "playing",
        "run_id": run_id,
    })))
}

// ---------------------------------------------------------------------------
// POST /motions/stop -- cancel playback
// ---------------------------------------------------------------------------

/// Cancel a live playback run by id.
pub async fn stop_motion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StopRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.coordinator.stop_motion(request.run_id).await {
        Ok(Json(serde_json::json!({ "status": "stopped" })))
    } else {
        Err(ApiError::NotFound(format!("run {}", request.run_id)))
    }
}
