//! Application state shared across server tasks

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::game::world::ObstacleField;
use crate::game::{World, WorldHandle};
use crate::net::protocol::ServerEvent;
use crate::net::TrustLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub trust: Arc<TrustLayer>,
    pub world: WorldHandle,
}

impl AppState {
    /// Wire up the trust layer and the world around one shared event
    /// channel. Returns the world alongside so the caller can spawn its
    /// tick loop.
    pub fn new(config: Config, obstacles: ObstacleField) -> (Self, World) {
        let config = Arc::new(config);

        let (events_tx, _) = broadcast::channel::<ServerEvent>(512);

        let trust = Arc::new(TrustLayer::new(&config, events_tx.clone()));

        let (world, world_handle) = World::new(&config, trust.clone(), events_tx, obstacles);

        let state = Self {
            config,
            trust,
            world: world_handle,
        };

        (state, world)
    }
}
