//! Snapshot building for the observer broadcast

use std::collections::HashMap;
use uuid::Uuid;

use crate::game::agent::{Agent, AgentKind};
use crate::game::ai::AiController;
use crate::net::protocol::{AgentSnapshot, ServerEvent};

/// Builds world snapshots at a fixed tick interval
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message
    pub fn build(
        &self,
        tick: u64,
        agents: &HashMap<Uuid, Agent>,
        controllers: &HashMap<Uuid, AiController>,
    ) -> ServerEvent {
        let agent_snapshots: Vec<AgentSnapshot> = agents
            .values()
            .map(|agent| {
                let controller = match agent.kind {
                    AgentKind::Ai => controllers.get(&agent.id),
                    AgentKind::Player => None,
                };

                AgentSnapshot {
                    agent_id: agent.id,
                    position: agent.position,
                    rotation: agent.rotation,
                    velocity: agent.velocity,
                    health: agent.health,
                    alive: agent.alive,
                    behavior: controller.map(|c| c.behavior()),
                    target_id: controller.and_then(|c| c.target()),
                }
            })
            .collect();

        ServerEvent::Snapshot {
            tick,
            agents: agent_snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn snapshots_respect_the_interval_and_force() {
        let mut builder = SnapshotBuilder::new(3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());

        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn ai_agents_carry_behavior_state() {
        let id = Uuid::new_v4();
        let mut agents = HashMap::new();
        agents.insert(
            id,
            Agent::new(id, "raider".to_string(), AgentKind::Ai, Vec2::ZERO, 0.0),
        );
        let mut controllers = HashMap::new();
        controllers.insert(id, AiController::new(1, Vec2::ZERO));

        let builder = SnapshotBuilder::new(1);
        let snapshot = builder.build(5, &agents, &controllers);
        match snapshot {
            ServerEvent::Snapshot { tick, agents } => {
                assert_eq!(tick, 5);
                assert_eq!(agents.len(), 1);
                assert!(agents[0].behavior.is_some());
                assert!(agents[0].target_id.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
