//! Event and intent definitions for the authority boundary
//! Intents come in from peers, events fan out to observers

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quality::NetQuality;

/// Behavior states for AI-controlled vehicles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiBehavior {
    /// Stationary, no patrol route configured
    Idle,
    /// Driving a patrol route or roaming a patrol area
    Patrol,
    /// Closing on a detected target
    Chase,
    /// In weapons range, engaging
    Attack,
    /// Running from the target at low health
    Flee,
    /// Heading to the target's last known position
    Search,
}

impl Default for AiBehavior {
    fn default() -> Self {
        Self::Idle
    }
}

/// AI difficulty tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiDifficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Default for AiDifficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// Categories of implausible client-reported actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Reported movement faster than any vehicle can drive
    SpeedHack,
    /// Large positional jump in a near-zero time window
    TeleportHack,
    /// Weapon fire rate above the hardware cap
    RapidFireHack,
    /// Sustained ping above the server limit
    HighPing,
    /// Sustained packet loss above the server limit
    HighPacketLoss,
}

/// Intents submitted by a connected peer, validated before application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Reported position for this simulation step
    Move {
        /// New world position (cm)
        position: Vec2,
        /// Seconds since the previous report
        delta_time: f32,
    },

    /// Reported weapon discharge
    Fire {
        /// Weapon identifier
        weapon: String,
        /// Claimed shots per second
        fire_rate: f32,
        /// Aim point in world space
        aim: Vec2,
    },

    /// Claimed hit on another agent, checked against its rewound position
    HitClaim {
        target_id: Uuid,
        hit_location: Vec2,
    },

    /// Periodic link statistics sample
    StatsReport {
        ping: f32,
        packet_loss: f32,
        jitter: f32,
    },

    /// Cosmetic action, passes through the trust layer unvalidated
    Emote {
        name: String,
    },
}

/// Action shapes the trust layer knows how to screen
#[derive(Debug, Clone)]
pub enum PlayerAction {
    Movement { position: Vec2, delta_time: f32 },
    Weapon { weapon: String, fire_rate: f32 },
    Other { kind: String },
}

/// Events broadcast from the authority to all observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Client registered with the trust layer
    ClientJoined {
        client_id: Uuid,
        display_name: String,
    },

    /// Client unregistered (leave or disconnect)
    ClientLeft {
        client_id: Uuid,
        display_name: String,
    },

    /// A validation check flagged an implausible action
    SuspiciousActivity {
        client_id: Uuid,
        category: ViolationKind,
        details: String,
    },

    /// Client removed for accumulated violations
    ClientKicked {
        client_id: Uuid,
        reason: String,
    },

    /// Client permanently banned for this server session
    ClientBanned {
        client_id: Uuid,
        reason: String,
    },

    /// Connection quality tier changed for a client
    QualityChanged {
        client_id: Uuid,
        quality: NetQuality,
    },

    /// AI agent switched behavior state
    BehaviorChanged {
        agent_id: Uuid,
        new_state: AiBehavior,
        old_state: AiBehavior,
    },

    /// AI agent locked onto a target
    TargetAcquired {
        agent_id: Uuid,
        target_id: Uuid,
    },

    /// AI agent lost its target
    TargetLost {
        agent_id: Uuid,
    },

    /// Agent issued an aim+shoot intent
    AgentFired {
        agent_id: Uuid,
        aim: Vec2,
    },

    /// Claimed hit survived lag-compensated validation and was applied
    HitConfirmed {
        shooter_id: Uuid,
        target_id: Uuid,
        damage: f32,
    },

    /// World state snapshot (sent at regular intervals)
    Snapshot {
        /// Server tick number
        tick: u64,
        /// All agent states
        agents: Vec<AgentSnapshot>,
    },
}

/// Agent state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: Uuid,
    /// World position (cm)
    pub position: Vec2,
    /// Heading in radians
    pub rotation: f32,
    /// Current velocity (cm/s)
    pub velocity: Vec2,
    /// Remaining health
    pub health: f32,
    /// Is the agent alive
    pub alive: bool,
    /// Behavior state (AI agents only)
    pub behavior: Option<AiBehavior>,
    /// Current target (AI agents only)
    pub target_id: Option<Uuid>,
}
