//! Authoritative world state and tick loop
//!
//! One fixed-step loop owns every agent: client intents are drained,
//! screened by the trust layer and applied; AI controllers run; vehicle
//! kinematics integrate; snapshots fan out to observers. The trust
//! layer's lower-frequency passes are folded in on tick boundaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::game::agent::{Agent, AgentKind};
use crate::game::ai::{AiController, AiEvent, LineOfSight, Perception, TargetInfo};
use crate::game::snapshot::SnapshotBuilder;
use crate::game::steering::{self, VehicleStats};
use crate::game::ClientInput;
use crate::net::protocol::{AiDifficulty, ClientIntent, PlayerAction, ServerEvent};
use crate::net::quality::NetStatsSample;
use crate::net::TrustLayer;
use crate::util::time::{
    tick_delta, QUALITY_PASS_INTERVAL_TICKS, REPLICATION_PASS_INTERVAL_TICKS, SIMULATION_TPS,
    SNAPSHOT_TPS, TICK_DURATION_MICROS,
};

/// Damage applied per validated hit claim
const HIT_CLAIM_DAMAGE: f32 = 10.0;

/// A static blocker in the world
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f32,
}

/// The world's obstruction set, queried for line-of-sight checks
#[derive(Debug, Clone, Default)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// Does the segment pass within any obstacle's radius
    fn blocked(&self, from: Vec2, to: Vec2) -> bool {
        self.obstacles
            .iter()
            .any(|obstacle| segment_hits_circle(from, to, obstacle.position, obstacle.radius))
    }
}

impl LineOfSight for ObstacleField {
    fn clear(&self, from: Vec2, to: Vec2, _target: Uuid) -> bool {
        !self.blocked(from, to)
    }
}

/// Closest-point-on-segment test against a circle
fn segment_hits_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    let ab = b - a;
    let t = if ab.length_squared() > 0.0 {
        ((center - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + ab * t;
    closest.distance_squared(center) <= radius * radius
}

/// Handle to a running world
#[derive(Clone)]
pub struct WorldHandle {
    pub intent_tx: mpsc::Sender<ClientInput>,
    pub events_tx: broadcast::Sender<ServerEvent>,
}

impl WorldHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events_tx.subscribe()
    }
}

/// The authoritative world
pub struct World {
    agents: HashMap<Uuid, Agent>,
    controllers: HashMap<Uuid, AiController>,
    obstacles: ObstacleField,
    vehicle_stats: VehicleStats,

    trust: Arc<TrustLayer>,
    events: broadcast::Sender<ServerEvent>,
    intent_rx: mpsc::Receiver<ClientInput>,
    snapshot_builder: SnapshotBuilder,

    tick: u64,
    seed: u64,
    ai_spawned: u64,
}

impl World {
    pub fn new(
        config: &Config,
        trust: Arc<TrustLayer>,
        events: broadcast::Sender<ServerEvent>,
        obstacles: ObstacleField,
    ) -> (Self, WorldHandle) {
        let (intent_tx, intent_rx) = mpsc::channel(256);

        let handle = WorldHandle {
            intent_tx,
            events_tx: events.clone(),
        };

        let world = Self {
            agents: HashMap::new(),
            controllers: HashMap::new(),
            obstacles,
            vehicle_stats: VehicleStats::default(),
            trust,
            events,
            intent_rx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            tick: 0,
            seed: config.world_seed,
            ai_spawned: 0,
        };

        (world, handle)
    }

    /// Spawn an AI-controlled vehicle roaming around its spawn point
    pub fn spawn_ai_agent(
        &mut self,
        name: &str,
        position: Vec2,
        rotation: f32,
        difficulty: AiDifficulty,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let agent = Agent::new(id, name.to_string(), AgentKind::Ai, position, rotation);

        let seed = self.seed.wrapping_add(self.ai_spawned);
        self.ai_spawned += 1;

        let mut controller = AiController::new(seed, position);
        controller.set_difficulty(difficulty);

        self.agents.insert(id, agent);
        self.controllers.insert(id, controller);

        info!(agent_id = %id, name = name, difficulty = ?difficulty, "AI agent spawned");
        id
    }

    /// Spawn the vehicle for a registered client. The agent id is the
    /// client id, so intents route without a mapping table.
    pub fn spawn_player_agent(&mut self, client_id: Uuid, name: &str, position: Vec2) {
        let agent = Agent::new(client_id, name.to_string(), AgentKind::Player, position, 0.0);
        self.agents.insert(client_id, agent);

        info!(agent_id = %client_id, name = name, "Player agent spawned");
    }

    /// Remove an agent and cancel its controller's pending work
    pub fn despawn_agent(&mut self, id: Uuid) {
        self.controllers.remove(&id);
        if self.agents.remove(&id).is_some() {
            info!(agent_id = %id, "Agent despawned");
        }
    }

    pub fn agent(&self, id: Uuid) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn controller(&self, id: Uuid) -> Option<&AiController> {
        self.controllers.get(&id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(tps = SIMULATION_TPS, "World loop started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.step();
        }
    }

    /// One full simulation step: drain intents, tick, snapshot
    pub fn step(&mut self) {
        self.process_intents();
        self.run_tick();
        self.broadcast_snapshot();
    }

    /// Drain all pending client intents
    fn process_intents(&mut self) {
        while let Ok(input) = self.intent_rx.try_recv() {
            self.apply_intent(input.client_id, input.intent);
        }
    }

    /// Screen one intent through the trust layer and apply it on success
    fn apply_intent(&mut self, client_id: Uuid, intent: ClientIntent) {
        if !self.trust.check_intent_rate(client_id) {
            debug!(client_id = %client_id, "Intent dropped by rate limiter");
            return;
        }

        match intent {
            ClientIntent::Move {
                position,
                delta_time,
            } => {
                let action = PlayerAction::Movement {
                    position,
                    delta_time,
                };
                if self.trust.validate_action(client_id, &action) {
                    if let Some(agent) = self.agents.get_mut(&client_id) {
                        agent.velocity = if delta_time > 0.0 {
                            (position - agent.position) / delta_time
                        } else {
                            Vec2::ZERO
                        };
                        agent.position = position;
                    }
                }
            }

            ClientIntent::Fire {
                weapon,
                fire_rate,
                aim,
            } => {
                let action = PlayerAction::Weapon { weapon, fire_rate };
                if self.trust.validate_action(client_id, &action) {
                    let _ = self.events.send(ServerEvent::AgentFired {
                        agent_id: client_id,
                        aim,
                    });
                }
            }

            ClientIntent::HitClaim {
                target_id,
                hit_location,
            } => self.apply_hit_claim(client_id, target_id, hit_location),

            ClientIntent::StatsReport {
                ping,
                packet_loss,
                jitter,
            } => {
                self.trust.update_client_stats(
                    client_id,
                    NetStatsSample {
                        ping,
                        packet_loss,
                        jitter,
                    },
                );
            }

            ClientIntent::Emote { name } => {
                let action = PlayerAction::Other { kind: name };
                if self.trust.validate_action(client_id, &action) {
                    debug!(client_id = %client_id, "Emote accepted");
                }
            }
        }
    }

    /// Check a claimed hit against the target's lag-compensated position
    /// and apply damage when it holds up
    fn apply_hit_claim(&mut self, client_id: Uuid, target_id: Uuid, hit_location: Vec2) {
        let ping = self
            .trust
            .client_info(client_id)
            .map(|record| record.stats.ping)
            .unwrap_or(0.0);

        let Some(target_position) = self.agents.get(&target_id).map(|a| a.position) else {
            return;
        };

        if !self
            .trust
            .is_hit_valid(target_id, hit_location, target_position, ping)
        {
            debug!(client_id = %client_id, target_id = %target_id, "Hit claim rejected");
            return;
        }

        if let Some(target) = self.agents.get_mut(&target_id) {
            let killed = target.apply_damage(HIT_CLAIM_DAMAGE);
            if killed {
                info!(agent_id = %target_id, "Agent destroyed");
            }

            let _ = self.events.send(ServerEvent::HitConfirmed {
                shooter_id: client_id,
                target_id,
                damage: HIT_CLAIM_DAMAGE,
            });
        }
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        self.tick += 1;
        let dt = tick_delta();

        self.update_ai(dt);

        // Lower-frequency trust passes ride on tick boundaries
        if self.tick % QUALITY_PASS_INTERVAL_TICKS == 0 {
            self.trust.update_network_quality();
            self.trust.validate_all_clients();
        }
        if self.tick % REPLICATION_PASS_INTERVAL_TICKS == 0 {
            self.trust.optimize_replication();
        }
    }

    /// Sense/decide/act for every AI agent, then integrate its vehicle
    fn update_ai(&mut self, dt: f32) {
        let candidates: Vec<TargetInfo> = self
            .agents
            .values()
            .filter(|agent| agent.kind == AgentKind::Player && agent.alive)
            .map(|agent| TargetInfo {
                id: agent.id,
                position: agent.position,
                velocity: agent.velocity,
            })
            .collect();

        let ids: Vec<Uuid> = self.controllers.keys().copied().collect();
        for id in ids {
            let Some(agent_view) = self.agents.get(&id).cloned() else {
                continue;
            };

            let update = {
                let perception = Perception {
                    targets: &candidates,
                    los: &self.obstacles,
                };
                match self.controllers.get_mut(&id) {
                    Some(controller) => controller.update(&agent_view, &perception, dt),
                    None => continue,
                }
            };

            if let Some(agent) = self.agents.get_mut(&id) {
                steering::integrate(agent, update.drive, &self.vehicle_stats, dt);
            }

            for event in update.events {
                self.emit_ai_event(id, event);
            }

            if let Some(aim) = update.fire_at {
                let _ = self.events.send(ServerEvent::AgentFired { agent_id: id, aim });
            }
        }
    }

    fn emit_ai_event(&self, agent_id: Uuid, event: AiEvent) {
        match event {
            AiEvent::BehaviorChanged {
                new_state,
                old_state,
            } => {
                info!(
                    agent_id = %agent_id,
                    old_state = ?old_state,
                    new_state = ?new_state,
                    "Behavior changed"
                );
                let _ = self.events.send(ServerEvent::BehaviorChanged {
                    agent_id,
                    new_state,
                    old_state,
                });
            }
            AiEvent::TargetAcquired { target_id } => {
                info!(agent_id = %agent_id, target_id = %target_id, "Target acquired");
                let _ = self
                    .events
                    .send(ServerEvent::TargetAcquired { agent_id, target_id });
            }
            AiEvent::TargetLost => {
                info!(agent_id = %agent_id, "Target lost");
                let _ = self.events.send(ServerEvent::TargetLost { agent_id });
            }
        }
    }

    fn broadcast_snapshot(&mut self) {
        if self.snapshot_builder.should_send() {
            let snapshot = self
                .snapshot_builder
                .build(self.tick, &self.agents, &self.controllers);
            let _ = self.events.send(snapshot);
        }
    }
}
