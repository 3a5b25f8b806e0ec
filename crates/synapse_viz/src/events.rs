//! Real-time event system for pushing visualization updates to WebSocket clients.
//!
//! The [`EventBroadcaster`] fans [`VizEvent`]s out to every connected client over a
//! Tokio `broadcast` channel. Events are emitted when the architecture is replaced,
//! when the selection or search changes, when the view is panned or zoomed, when the
//! animation scheduler spawns or retires particles, and when a scene is exported.
//!
//! # Examples
//!
//! ```
//! use synapse_viz::{EventBroadcaster, VizEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let broadcaster = EventBroadcaster::new();
//!     let mut receiver = broadcaster.subscribe();
//!
//!     broadcaster.broadcast(VizEvent::particles_retired(3)).await;
//!
//!     if let Ok(VizEvent::ParticlesRetired { count }) = receiver.recv().await {
//!         assert_eq!(count, 3);
//!     }
//! }
//! ```

use crate::scene::SceneStats;
use crate::selection::{Inspection, Regime, SelectionState};
use crate::transform::ViewTransform;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// The maximum number of events to buffer in the broadcast channel.
const EVENT_BUFFER_SIZE: usize = 1000;

/// Events broadcast to visualization clients.
///
/// Serialized with a `type` field discriminating the variant:
///
/// ```json
/// { "type": "particles_spawned", "batch": 12, "count": 9, "highlighted": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VizEvent {
    /// The scene geometry was rebuilt (new architecture or viewport).
    SceneUpdated {
        /// Display name of the architecture.
        title: String,
        /// Counts of the new scene.
        stats: SceneStats,
    },

    /// Hover, pin or search changed.
    SelectionChanged {
        /// The new hover/pin state.
        inspection: Inspection,
        /// The search query as typed.
        search_query: String,
        /// The regime weights are now derived under.
        regime: Regime,
    },

    /// The pan/zoom transform changed.
    ViewChanged {
        /// The new transform.
        transform: ViewTransform,
    },

    /// The scheduler spawned a batch of particles.
    ParticlesSpawned {
        /// Batch id.
        batch: u64,
        /// Number of particles in the batch.
        count: usize,
        /// Whether the batch pulses highlighted edges.
        highlighted: bool,
    },

    /// Particles reached their target or were swept.
    ParticlesRetired {
        /// Number of particles removed.
        count: usize,
    },

    /// A snapshot was exported.
    Exported {
        /// Name of the produced file.
        file_name: String,
        /// MIME type of the payload.
        mime_type: String,
        /// Payload size in bytes.
        size: usize,
    },

    /// A new client has connected.
    Connected {
        /// The unique identifier for the connected client.
        client_id: String,
    },

    /// Keep-alive.
    Ping {
        /// Unix timestamp in milliseconds.
        timestamp: i64,
    },

    /// An error clients should be aware of.
    Error {
        /// A description of the error.
        message: String,
    },
}

impl VizEvent {
    /// Creates a `SceneUpdated` event.
    pub fn scene_updated(title: impl Into<String>, stats: SceneStats) -> Self {
        VizEvent::SceneUpdated {
            title: title.into(),
            stats,
        }
    }

    /// Creates a `SelectionChanged` event from the current state.
    pub fn selection_changed(selection: &SelectionState) -> Self {
        VizEvent::SelectionChanged {
            inspection: selection.inspection.clone(),
            search_query: selection.search_query.clone(),
            regime: selection.regime(),
        }
    }

    /// Creates a `ViewChanged` event.
    pub fn view_changed(transform: ViewTransform) -> Self {
        VizEvent::ViewChanged { transform }
    }

    /// Creates a `ParticlesRetired` event.
    pub fn particles_retired(count: usize) -> Self {
        VizEvent::ParticlesRetired { count }
    }

    /// Creates a `Ping` event with the current timestamp.
    pub fn ping() -> Self {
        VizEvent::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Creates an `Error` event.
    pub fn error(message: impl Into<String>) -> Self {
        VizEvent::Error {
            message: message.into(),
        }
    }

    /// Serializes the event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A cloneable handle fanning [`VizEvent`]s out to all subscribers.
///
/// The channel buffers 1000 events; a receiver that falls further behind misses
/// the oldest ones.
#[derive(Debug)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<VizEvent>,
    clients: Arc<RwLock<HashSet<String>>>,
    event_count: Arc<RwLock<u64>>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with no clients.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            sender,
            clients: Arc::new(RwLock::new(HashSet::new())),
            event_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<VizEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event. Returns the number of receivers it reached.
    ///
    /// ```
    /// use synapse_viz::{EventBroadcaster, VizEvent};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let broadcaster = EventBroadcaster::new();
    ///     let _r1 = broadcaster.subscribe();
    ///     let _r2 = broadcaster.subscribe();
    ///     assert_eq!(broadcaster.broadcast(VizEvent::ping()).await, 2);
    /// }
    /// ```
    pub async fn broadcast(&self, event: VizEvent) -> usize {
        {
            let mut count = self.event_count.write().await;
            *count += 1;
        }

        self.sender.send(event).unwrap_or(0)
    }

    /// Registers a client and announces it with [`VizEvent::Connected`].
    pub async fn register_client(&self, client_id: String) {
        self.clients.write().await.insert(client_id.clone());
        let _ = self.broadcast(VizEvent::Connected { client_id }).await;
    }

    /// Removes a client.
    pub async fn unregister_client(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Total events broadcast since creation.
    pub async fn event_count(&self) -> u64 {
        *self.event_count.read().await
    }

    /// Broadcasts [`VizEvent::SceneUpdated`].
    pub async fn scene_updated(&self, title: &str, stats: SceneStats) -> usize {
        self.broadcast(VizEvent::scene_updated(title, stats)).await
    }

    /// Broadcasts [`VizEvent::SelectionChanged`].
    pub async fn selection_changed(&self, selection: &SelectionState) -> usize {
        self.broadcast(VizEvent::selection_changed(selection)).await
    }

    /// Broadcasts [`VizEvent::ViewChanged`].
    pub async fn view_changed(&self, transform: ViewTransform) -> usize {
        self.broadcast(VizEvent::view_changed(transform)).await
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBroadcaster {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            clients: Arc::clone(&self.clients),
            event_count: Arc::clone(&self.event_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UnitId;

    #[tokio::test]
    async fn test_event_broadcaster() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        let stats = SceneStats {
            layer_count: 3,
            node_count: 9,
            edge_count: 18,
        };
        broadcaster.scene_updated("Demo", stats).await;

        match receiver.recv().await.unwrap() {
            VizEvent::SceneUpdated { title, stats: received } => {
                assert_eq!(title, "Demo");
                assert_eq!(received.edge_count, 18);
            }
            other => panic!("Wrong event type: {:?}", other),
        }
        assert_eq!(broadcaster.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_client_registration() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.register_client("client1".to_string()).await;
        assert_eq!(broadcaster.client_count().await, 1);
        assert!(matches!(receiver.recv().await.unwrap(), VizEvent::Connected { .. }));

        broadcaster.unregister_client("client1").await;
        assert_eq!(broadcaster.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_without_receivers() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.broadcast(VizEvent::ping()).await, 0);
    }

    #[test]
    fn test_selection_event_serialization() {
        let mut selection = SelectionState::default();
        selection.toggle_unit(UnitId::new(1, 2), "dense_1");
        let json = VizEvent::selection_changed(&selection).to_json();
        assert!(json.contains("\"type\":\"selection_changed\""));
        assert!(json.contains("\"regime\":\"selection\""));
        assert!(json.contains("dense_1"));
    }

    #[test]
    fn test_ping_serialization() {
        let json = VizEvent::ping().to_json();
        assert!(json.contains("ping"));
        assert!(json.contains("timestamp"));
    }
}
