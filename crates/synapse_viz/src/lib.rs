//! # Synapse Viz - Neural Network Architecture Explorer
//!
//! Interactive visualization engine for layered neural network architectures.
//!
//! ## Overview
//!
//! Given an [`Architecture`] (an ordered list of typed layers, each with a neuron
//! count and a relative importance), this crate lays the network out as columns of
//! units connected by full bipartite edges, derives highlighting from hover, click
//! and search state, animates signal particles along edges, and exports the current
//! frame as SVG or PNG. An axum server exposes all of it over REST and WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Synapse Viz - Engine + Server                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  Architecture ──► layout ──► edges ──► Scene (geometry)       │
//! │                                          │                    │
//! │  InteractionEvent ──► Visualization ─────┤                    │
//! │    hover / click / search   SelectionState                    │
//! │    wheel / drag             ViewTransform                     │
//! │                                          ▼                    │
//! │                                   RenderedScene ──► export    │
//! │                                          │          SVG / PNG │
//! │  AnimationScheduler (tokio task) ──► ParticleSet              │
//! │                                                               │
//! │  HTTP Server (axum, port 8888)                                │
//! │  ├── GET  /api/scene        → current frame                   │
//! │  ├── POST /api/interaction  → apply a gesture                 │
//! │  ├── GET  /api/export/svg   → snapshot                        │
//! │  └── WS   /ws/updates       → event stream                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use synapse_viz::{
//!     Architecture, InteractionEvent, LayerBuilder, LayerType, LayoutConfig, UnitId, Viewport,
//!     Visualization,
//! };
//!
//! let arch = Architecture::new("mlp")
//!     .with_layer(LayerBuilder::new("in", LayerType::Input).neurons(784).importance(0.3).build())
//!     .with_layer(LayerBuilder::new("h1", LayerType::Dense).neurons(128).importance(0.9).build())
//!     .with_layer(LayerBuilder::new("out", LayerType::Output).neurons(10).importance(0.7).build());
//!
//! let mut viz = Visualization::new(arch, LayoutConfig::default());
//! viz.mount(Viewport::new(1200.0, 600.0));
//!
//! // at most ten units per layer are drawn
//! assert_eq!(viz.rendered().unwrap().stats.node_count, 30);
//!
//! viz.handle(InteractionEvent::Click { unit: UnitId::new(1, 0) });
//! assert_eq!(viz.inspector().unwrap().layer.id, "h1");
//! ```

pub mod analysis;
pub mod animation;
pub mod api;
pub mod architecture;
pub mod config;
pub mod edges;
pub mod error;
pub mod events;
pub mod export;
pub mod interaction;
pub mod layout;
pub mod scene;
pub mod selection;
pub mod server;
pub mod transform;

pub use analysis::{recommendations, ArchitectureSummary, Finding, Recommendation};
pub use animation::{AnimationConfig, AnimationHandle, AnimationScheduler, Particle, ParticleSet};
pub use api::ApiState;
pub use architecture::{Architecture, ArchitectureStats, Layer, LayerBuilder, LayerType};
pub use config::EngineConfig;
pub use edges::{build_edges, VisualEdge};
pub use error::{Error, Result};
pub use events::{EventBroadcaster, VizEvent};
pub use export::{DirectorySink, ExportFormat, ExportSink, ExportedFile, MemorySink};
pub use interaction::{InteractionEvent, InteractionOutcome, Visualization};
pub use layout::{LayoutConfig, UnitId, Viewport, VisualUnit};
pub use scene::{RenderedScene, Scene, SceneStats};
pub use selection::{importance_score, InspectorData, Inspection, Regime, SelectionState, VisualWeight};
pub use server::{VizConfig, VizServer};
pub use transform::ViewTransform;

/// Version information from Cargo.toml.
///
/// ```
/// use synapse_viz::VERSION;
///
/// println!("Synapse Viz version: {}", VERSION);
/// ```
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
