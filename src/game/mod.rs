//! Game simulation modules

pub mod agent;
pub mod ai;
pub mod difficulty;
pub mod snapshot;
pub mod steering;
pub mod world;

pub use world::{World, WorldHandle};

use uuid::Uuid;

use crate::net::protocol::ClientIntent;

/// Client intent received from the session transport
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub client_id: Uuid,
    pub intent: ClientIntent,
    pub received_at: u64,
}
