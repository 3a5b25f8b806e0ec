//! HTTP and WebSocket server for the visualization.
//!
//! [`VizServer`] mounts the visualization, starts the animation scheduler, and serves
//! the API from [`crate::api`] with optional CORS and request tracing. When the
//! server stops, the scheduler is stopped with it.
//!
//! # Examples
//!
//! ```rust,ignore
//! use synapse_viz::{Architecture, EngineConfig, VizConfig, VizServer};
//!
//! #[tokio::main]
//! async fn main() -> synapse_viz::Result<()> {
//!     let arch = Architecture::from_json(&std::fs::read_to_string("model.json")?)?;
//!     let server = VizServer::new(VizConfig::default(), EngineConfig::default(), arch);
//!
//!     let shutdown = async {
//!         tokio::signal::ctrl_c().await.ok();
//!     };
//!     server.start_with_shutdown(shutdown).await
//! }
//! ```

use crate::animation::{AnimationHandle, AnimationScheduler};
use crate::api::{create_router, ApiState};
use crate::architecture::Architecture;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::interaction::Visualization;

use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Configuration for the visualization server.
///
/// ```
/// use synapse_viz::VizConfig;
///
/// let config = VizConfig::default();
/// assert_eq!(config.host, "127.0.0.1");
/// assert_eq!(config.port, 8888);
///
/// let dev = VizConfig::development();
/// assert_eq!(dev.host, "0.0.0.0");
/// ```
#[derive(Debug, Clone)]
pub struct VizConfig {
    /// The host address to bind the server to.
    pub host: String,

    /// The port to listen on.
    pub port: u16,

    /// Whether to send permissive CORS headers.
    pub enable_cors: bool,

    /// Whether to log every HTTP request.
    pub enable_tracing: bool,

    /// Seed for particle sampling; random when `None`.
    pub animation_seed: Option<u64>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            enable_cors: true,
            enable_tracing: true,
            animation_seed: None,
        }
    }
}

impl VizConfig {
    /// Binds to all interfaces with CORS and tracing on.
    pub fn development() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Localhost only, without CORS or tracing.
    pub fn production() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            enable_cors: false,
            enable_tracing: false,
            animation_seed: None,
        }
    }

    /// Converts the host and port into a [`SocketAddr`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not a valid IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))
    }
}

/// The visualization server.
pub struct VizServer {
    config: VizConfig,
    engine: EngineConfig,
    state: ApiState,
}

impl VizServer {
    /// Creates a server for `architecture`. Nothing is mounted until it starts.
    pub fn new(config: VizConfig, engine: EngineConfig, architecture: Architecture) -> Self {
        let viz = Visualization::new(architecture, engine.layout.clone());
        Self {
            config,
            engine,
            state: ApiState::new(viz),
        }
    }

    /// Creates a server around existing shared state.
    pub fn with_state(config: VizConfig, engine: EngineConfig, state: ApiState) -> Self {
        Self {
            config,
            engine,
            state,
        }
    }

    /// The shared state.
    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// The engine configuration.
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Mounts the visualization at the configured viewport and starts the
    /// scheduler. Called by the `start` methods.
    pub async fn prepare(&self) -> AnimationHandle {
        let outcome = self.state.viz.write().await.mount(self.engine.viewport);
        if outcome.relayout {
            let viz = self.state.viz.read().await;
            if let Some(rendered) = viz.rendered() {
                self.state
                    .broadcaster
                    .scene_updated(&rendered.title, rendered.stats)
                    .await;
            }
        }

        let rng = match self.config.animation_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };
        AnimationScheduler::new(self.engine.animation.clone()).start(
            self.state.viz.clone(),
            self.state.particles.clone(),
            Some(self.state.broadcaster.clone()),
            rng,
        )
    }

    fn router(&self) -> Router {
        let mut app = create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        if self.config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }
        app
    }

    /// Runs the server until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, binding fails, or the server
    /// fails while running.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Runs the server until `shutdown_signal` completes, then stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, binding fails, or the server
    /// fails while running.
    pub async fn start_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind: {}", e)))?;

        let animation = self.prepare().await;

        log::info!("Starting Synapse Viz server on http://{}", addr);
        log::info!("  - Scene:     http://{}/api/scene", addr);
        log::info!("  - Export:    http://{}/api/export/svg", addr);
        log::info!("  - WebSocket: ws://{}/ws/updates", addr);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| Error::Server(format!("Server error: {}", e)));

        animation.stop().await;
        self.state.viz.write().await.unmount();
        log::info!("Server shutdown complete");
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{LayerBuilder, LayerType};

    fn arch() -> Architecture {
        Architecture::new("t")
            .with_layer(LayerBuilder::new("a", LayerType::Input).neurons(2).build())
            .with_layer(LayerBuilder::new("b", LayerType::Output).neurons(2).build())
    }

    #[test]
    fn test_config_default() {
        let config = VizConfig::default();
        assert_eq!(config.port, 8888);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_cors);
        assert!(config.enable_tracing);
        assert!(config.animation_seed.is_none());
    }

    #[test]
    fn test_config_production() {
        let config = VizConfig::production();
        assert!(!config.enable_cors);
        assert!(!config.enable_tracing);
    }

    #[test]
    fn test_config_socket_addr() {
        let config = VizConfig {
            port: 9000,
            ..VizConfig::development()
        };
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn test_config_socket_addr_invalid() {
        let config = VizConfig {
            host: "not-a-valid-ip".to_string(),
            ..VizConfig::default()
        };
        let err = config.socket_addr().unwrap_err();
        assert!(format!("{}", err).contains("Configuration"));
    }

    #[test]
    fn test_server_not_mounted_before_start() {
        let server = VizServer::new(VizConfig::default(), EngineConfig::default(), arch());
        assert!(!server.state().viz.try_read().unwrap().is_mounted());
    }

    #[tokio::test]
    async fn test_prepare_mounts_and_starts_scheduler() {
        let config = VizConfig {
            animation_seed: Some(3),
            ..VizConfig::default()
        };
        let server = VizServer::new(config, EngineConfig::compact(), arch());
        let handle = server.prepare().await;
        assert!(handle.is_running());
        {
            let viz = server.state().viz.read().await;
            assert!(viz.is_mounted());
            assert_eq!(viz.scene().unwrap().viewport, EngineConfig::compact().viewport);
        }
        handle.stop().await;
        assert!(server.state().particles.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_with_immediate_shutdown() {
        let config = VizConfig {
            port: 0,
            ..VizConfig::default()
        };
        let server = VizServer::new(config, EngineConfig::default(), arch());
        let state = server.state().clone();
        server.start_with_shutdown(async {}).await.unwrap();
        assert!(!state.viz.read().await.is_mounted());
    }
}
