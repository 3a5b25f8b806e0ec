//! REST and WebSocket API endpoints for the visualization server.
//!
//! # API Endpoints
//!
//! ## REST Endpoints
//!
//! - `GET /api/architecture` - The architecture being shown
//! - `PUT /api/architecture` - Replace it (re-lays out the scene)
//! - `GET /api/scene` - Current frame as a D3-style `{nodes, links, labels}` document
//! - `GET /api/inspector` - Pinned or hovered layer, `null` when none
//! - `GET /api/recommendations` - Architecture summary and structural advice
//! - `POST /api/interaction` - Apply one [`InteractionEvent`]
//! - `GET /api/particles` - Particles currently in flight
//! - `GET /api/export/{format}` - `svg` or `png` snapshot download
//! - `GET /api/stats` - Scene and WebSocket statistics
//!
//! ## WebSocket Endpoint
//!
//! - `WS /ws/updates` - Pushes [`VizEvent`]s; accepts `ping` or interaction events
//!   as JSON text frames.
//!
//! All handlers share an [`ApiState`] through axum's `State` extractor.

use crate::analysis::ArchitectureSummary;
use crate::animation::{ParticleSet, RenderedParticle, SharedParticles};
use crate::architecture::Architecture;
use crate::error::{Error, Result};
use crate::events::{EventBroadcaster, VizEvent};
use crate::export::{ExportFormat, ExportedFile, MemorySink};
use crate::interaction::{InteractionEvent, InteractionOutcome, Visualization};
use crate::selection::InspectorData;

use axum::extract::ws::{Message, WebSocket};
use axum::http::{header, StatusCode};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A specialized `Result` type for API handlers.
type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

fn error_response(e: Error) -> (StatusCode, String) {
    let status = match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn not_mounted() -> Error {
    Error::NotFound("no scene mounted".to_string())
}

/// The shared state for the axum application.
///
/// Cloning is cheap; every field is reference counted. Lock order is always
/// `viz` before `particles`.
#[derive(Clone)]
pub struct ApiState {
    /// The visualization. The animation task only ever read-locks it.
    pub viz: Arc<RwLock<Visualization>>,

    /// Particles written by the animation task.
    pub particles: SharedParticles,

    /// The event broadcaster for WebSocket clients.
    pub broadcaster: EventBroadcaster,
}

impl ApiState {
    /// Wraps a visualization with an empty particle set.
    pub fn new(viz: Visualization) -> Self {
        Self {
            viz: Arc::new(RwLock::new(viz)),
            particles: Arc::new(RwLock::new(ParticleSet::new())),
            broadcaster: EventBroadcaster::new(),
        }
    }

    /// Applies a gesture and broadcasts what it changed.
    pub async fn apply(&self, event: InteractionEvent) -> InteractionOutcome {
        let (outcome, selection, transform) = {
            let mut viz = self.viz.write().await;
            let outcome = viz.handle(event);
            (outcome, viz.selection().clone(), viz.transform())
        };
        if outcome.selection_changed {
            self.broadcaster.selection_changed(&selection).await;
        }
        if outcome.view_changed {
            self.broadcaster.view_changed(transform).await;
        }
        outcome
    }

    /// Replaces the architecture. Particles in flight belong to the old edge set and
    /// are dropped.
    pub async fn replace_architecture(&self, architecture: Architecture) -> InteractionOutcome {
        let (outcome, title, stats, selection) = {
            let mut viz = self.viz.write().await;
            let outcome = viz.set_architecture(architecture);
            self.particles.write().await.clear();
            let stats = viz.rendered().map(|r| r.stats).unwrap_or_default();
            (
                outcome,
                viz.architecture().display_name().to_string(),
                stats,
                viz.selection().clone(),
            )
        };
        log::info!("Architecture replaced with {} ({} units)", title, stats.node_count);
        self.broadcaster.scene_updated(&title, stats).await;
        if outcome.selection_changed {
            self.broadcaster.selection_changed(&selection).await;
        }
        outcome
    }

    /// Particles in flight right now, positioned on the mounted scene.
    pub async fn particles_now(&self) -> Vec<RenderedParticle> {
        let viz = self.viz.read().await;
        let set = self.particles.read().await;
        match viz.scene() {
            Some(scene) => set.renderable(set.elapsed_ms(), scene),
            None => Vec::new(),
        }
    }

    /// Exports the current frame, including particles. `Ok(None)` when unmounted.
    pub async fn export(&self, format: ExportFormat) -> Result<Option<ExportedFile>> {
        let particles = self.particles_now().await;
        let mut sink = MemorySink::default();
        let file = {
            let viz = self.viz.read().await;
            match format {
                ExportFormat::Svg => viz.export_vector(&mut sink, &particles)?,
                ExportFormat::Png => viz.export_raster(&mut sink, &particles)?,
            }
        };
        if let Some(file) = &file {
            self.broadcaster
                .broadcast(VizEvent::Exported {
                    file_name: file.file_name.clone(),
                    mime_type: file.mime_type.clone(),
                    size: file.bytes.len(),
                })
                .await;
        }
        Ok(file)
    }
}

/// Constructs the axum [`Router`] for the visualization server.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/architecture", get(get_architecture).put(put_architecture))
        .route("/api/scene", get(get_scene))
        .route("/api/inspector", get(get_inspector))
        .route("/api/recommendations", get(get_recommendations))
        .route("/api/interaction", post(post_interaction))
        .route("/api/particles", get(get_particles))
        .route("/api/export/{format}", get(get_export))
        .route("/api/stats", get(get_stats))
        .route("/ws/updates", get(ws_handler))
        .with_state(state)
}

/// API handler for `GET /api/architecture`.
async fn get_architecture(State(state): State<ApiState>) -> Json<Architecture> {
    Json(state.viz.read().await.architecture().clone())
}

/// API handler for `PUT /api/architecture`.
async fn put_architecture(
    State(state): State<ApiState>,
    Json(architecture): Json<Architecture>,
) -> Json<InteractionOutcome> {
    Json(state.replace_architecture(architecture).await)
}

/// API handler for `GET /api/scene`.
async fn get_scene(State(state): State<ApiState>) -> ApiResult<Json<serde_json::Value>> {
    let viz = state.viz.read().await;
    let rendered = viz.rendered().ok_or_else(not_mounted).map_err(error_response)?;
    let mut doc = rendered.to_d3_json();
    doc["transform"] = serde_json::json!(viz.transform());
    Ok(Json(doc))
}

/// API handler for `GET /api/inspector`.
async fn get_inspector(State(state): State<ApiState>) -> Json<Option<InspectorData>> {
    Json(state.viz.read().await.inspector())
}

/// API handler for `GET /api/recommendations`.
async fn get_recommendations(State(state): State<ApiState>) -> Json<ArchitectureSummary> {
    let viz = state.viz.read().await;
    Json(ArchitectureSummary::new(viz.architecture(), viz.layout()))
}

/// API handler for `POST /api/interaction`.
async fn post_interaction(
    State(state): State<ApiState>,
    Json(event): Json<InteractionEvent>,
) -> Json<InteractionOutcome> {
    Json(state.apply(event).await)
}

/// API handler for `GET /api/particles`.
async fn get_particles(State(state): State<ApiState>) -> Json<Vec<RenderedParticle>> {
    Json(state.particles_now().await)
}

/// API handler for `GET /api/export/{format}`. Serves the snapshot as an attachment.
async fn get_export(
    State(state): State<ApiState>,
    Path(format): Path<String>,
) -> ApiResult<Response> {
    let format: ExportFormat = format
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
    let file = state
        .export(format)
        .await
        .and_then(|file| file.ok_or_else(not_mounted))
        .map_err(error_response)?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// API handler for `GET /api/stats`.
async fn get_stats(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let (scene, mounted, regime) = {
        let viz = state.viz.read().await;
        (
            viz.rendered().map(|r| r.stats).unwrap_or_default(),
            viz.is_mounted(),
            viz.selection().regime(),
        )
    };
    let (particles, batches) = {
        let set = state.particles.read().await;
        (set.len(), set.batch_count())
    };
    let client_count = state.broadcaster.client_count().await;
    let event_count = state.broadcaster.event_count().await;

    Json(serde_json::json!({
        "scene": scene,
        "mounted": mounted,
        "regime": regime,
        "particles": {
            "in_flight": particles,
            "batches": batches,
        },
        "websocket": {
            "connected_clients": client_count,
            "total_events": event_count,
        }
    }))
}

/// API handler for `GET /ws/updates`. Upgrades the connection to a WebSocket.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handles the lifecycle of a single WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    log::info!("WebSocket client connected: {}", client_id);

    state.broadcaster.register_client(client_id.clone()).await;

    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.broadcaster.subscribe();

    // Initial frame, so the client can draw before the first event.
    {
        let viz = state.viz.read().await;
        let initial = serde_json::json!({
            "type": "initial_state",
            "data": viz.rendered().map(|r| r.to_d3_json()),
            "transform": viz.transform(),
        });
        drop(viz);
        if let Err(e) = sender.send(Message::Text(initial.to_string().into())).await {
            log::error!("Failed to send initial state to {}: {}", client_id, e);
            state.broadcaster.unregister_client(&client_id).await;
            return;
        }
    }

    let broadcaster = state.broadcaster.clone();
    let client_id_clone = client_id.clone();
    let send_task = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            if sender.send(Message::Text(event.to_json().into())).await.is_err() {
                break;
            }
        }
        broadcaster.unregister_client(&client_id_clone).await;
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                log::debug!("Received from {}: {}", client_id, text.as_str());
                if text.as_str() == "ping" {
                    let _ = state.broadcaster.broadcast(VizEvent::ping()).await;
                    continue;
                }
                match serde_json::from_str::<InteractionEvent>(text.as_str()) {
                    Ok(event) => {
                        state.apply(event).await;
                    }
                    Err(e) => {
                        log::warn!("Ignoring malformed message from {}: {}", client_id, e);
                        let _ = state.broadcaster.broadcast(VizEvent::error(e.to_string())).await;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client {} closed gracefully", client_id);
                break;
            }
            Err(e) => {
                log::error!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.broadcaster.unregister_client(&client_id).await;
    log::info!("WebSocket client disconnected: {}", client_id);
}
