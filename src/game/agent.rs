//! Agent records - authoritative per-vehicle state

use glam::Vec2;
use uuid::Uuid;

/// Who drives the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Controlled by a connected client
    Player,
    /// Controlled by the server-side AI
    Ai,
}

/// Authoritative state for one vehicle, AI- or player-controlled
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub kind: AgentKind,

    /// World position (cm)
    pub position: Vec2,
    /// Heading in radians
    pub rotation: f32,
    /// Velocity (cm/s)
    pub velocity: Vec2,

    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

impl Agent {
    pub fn new(id: Uuid, name: String, kind: AgentKind, position: Vec2, rotation: f32) -> Self {
        Self {
            id,
            name,
            kind,
            position,
            rotation,
            velocity: Vec2::ZERO,
            health: 100.0,
            max_health: 100.0,
            alive: true,
        }
    }

    /// Remaining health as a 0-1 fraction
    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_dead(&self) -> bool {
        !self.alive || self.health <= 0.0
    }

    /// Apply damage, returns true when this kills the agent
    pub fn apply_damage(&mut self, damage: f32) -> bool {
        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 && self.alive {
            self.alive = false;
            return true;
        }
        false
    }

    /// Unit vector along the vehicle's facing
    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.rotation.cos(), self.rotation.sin())
    }

    /// Unit vector to the vehicle's right
    pub fn right(&self) -> Vec2 {
        let forward = self.forward();
        Vec2::new(forward.y, -forward.x)
    }
}
