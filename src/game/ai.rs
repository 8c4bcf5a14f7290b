//! Combat AI controller - sense, decide, act, fire
//!
//! One controller per AI vehicle, driven by the world tick on the
//! authority. The controller never holds references into the world: the
//! current target is an id resolved against the sensed candidate list
//! every tick, so a destroyed target simply stops resolving.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::game::agent::Agent;
use crate::game::difficulty::{shot_accuracy_multiplier, DifficultyScaling};
use crate::game::steering::{drive_towards, has_reached, Drive, ARRIVAL_TOLERANCE};
use crate::net::protocol::{AiBehavior, AiDifficulty};

/// Lead applied to moving targets when aiming (s)
const TARGET_LEAD_TIME: f32 = 0.5;
/// Aim points are projected this far along the aim direction (cm)
const AIM_PROJECTION_DISTANCE: f32 = 1_000.0;
/// Widest aim spread at zero accuracy (degrees)
const MAX_AIM_SPREAD_DEG: f32 = 30.0;

/// Tunable behavior parameters. Scaled once when a difficulty tier is
/// assigned, constant afterwards.
#[derive(Debug, Clone)]
pub struct AiSettings {
    /// Targets beyond this distance are not acquired (cm)
    pub detection_range: f32,
    /// Weapons range (cm)
    pub attack_range: f32,
    /// Roaming radius around the patrol center (cm)
    pub patrol_radius: f32,
    /// Minimum time between shots (s)
    pub reaction_time: f32,
    /// Base aim accuracy, 0-1
    pub accuracy: f32,
    pub can_use_secondary: bool,
    pub can_flee: bool,
    /// Health fraction at or below which the agent flees
    pub flee_health_threshold: f32,
    /// Pause at each patrol point (s)
    pub patrol_wait_time: f32,
    /// Pause at the last known target location before giving up (s)
    pub search_dwell_time: f32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            detection_range: 2_000.0,
            attack_range: 1_000.0,
            patrol_radius: 5_000.0,
            reaction_time: 0.5,
            accuracy: 0.7,
            can_use_secondary: false,
            can_flee: true,
            flee_health_threshold: 0.3,
            patrol_wait_time: 3.0,
            search_dwell_time: 2.0,
        }
    }
}

/// A sensed candidate target (alive, player-controlled)
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub id: Uuid,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// World-query seam: single obstruction check from one point to another.
/// Anything on the segment other than the target itself blocks.
pub trait LineOfSight {
    fn clear(&self, from: Vec2, to: Vec2, target: Uuid) -> bool;
}

/// What the controller senses this tick
pub struct Perception<'a> {
    /// All alive player-controlled agents, in stable world order
    pub targets: &'a [TargetInfo],
    pub los: &'a dyn LineOfSight,
}

/// Observable transitions produced by one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiEvent {
    BehaviorChanged {
        new_state: AiBehavior,
        old_state: AiBehavior,
    },
    TargetAcquired {
        target_id: Uuid,
    },
    TargetLost,
}

/// Result of one controller update
#[derive(Debug, Clone)]
pub struct AiUpdate {
    pub drive: Drive,
    /// Aim point for an aim+shoot intent, when firing this tick
    pub fire_at: Option<Vec2>,
    pub events: Vec<AiEvent>,
}

/// Per-agent behavior state machine
pub struct AiController {
    pub settings: AiSettings,
    difficulty: AiDifficulty,
    behavior: AiBehavior,
    target: Option<Uuid>,
    last_known_target_location: Option<Vec2>,

    patrol_points: Vec<Vec2>,
    patrol_index: usize,
    patrol_center: Vec2,
    use_random_patrol: bool,
    destination: Option<Vec2>,

    patrol_wait_remaining: f32,
    search_dwell_remaining: f32,
    fire_cooldown: f32,

    rng: ChaCha8Rng,
}

impl AiController {
    /// Create a controller roaming around its spawn position
    pub fn new(seed: u64, spawn_position: Vec2) -> Self {
        Self {
            settings: AiSettings::default(),
            difficulty: AiDifficulty::Medium,
            behavior: AiBehavior::Idle,
            target: None,
            last_known_target_location: None,
            patrol_points: Vec::new(),
            patrol_index: 0,
            patrol_center: spawn_position,
            use_random_patrol: true,
            destination: None,
            patrol_wait_remaining: 0.0,
            search_dwell_remaining: 0.0,
            fire_cooldown: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn behavior(&self) -> AiBehavior {
        self.behavior
    }

    pub fn target(&self) -> Option<Uuid> {
        self.target
    }

    pub fn last_known_target_location(&self) -> Option<Vec2> {
        self.last_known_target_location
    }

    /// Follow an explicit patrol route (sequential, wrap-around)
    pub fn set_patrol_points(&mut self, points: Vec<Vec2>) {
        self.patrol_points = points;
        self.patrol_index = 0;
        self.use_random_patrol = false;
        self.destination = None;
    }

    /// Roam random points inside a radius around a center
    pub fn set_patrol_center(&mut self, center: Vec2, radius: f32) {
        self.patrol_center = center;
        self.settings.patrol_radius = radius;
        self.use_random_patrol = true;
        self.destination = None;
    }

    /// Apply a difficulty tier's multipliers to the behavior settings.
    /// One-time configuration transform, not a per-tick adjustment.
    pub fn set_difficulty(&mut self, tier: AiDifficulty) {
        let scaling = DifficultyScaling::for_tier(tier);
        self.difficulty = tier;
        self.settings.detection_range *= scaling.detection_range;
        self.settings.accuracy *= scaling.accuracy;
        self.settings.reaction_time *= scaling.reaction_time;
        if scaling.secondary_weapons {
            self.settings.can_use_secondary = true;
        }
    }

    fn has_patrol(&self) -> bool {
        self.use_random_patrol || !self.patrol_points.is_empty()
    }

    /// Run one sense/decide/act/fire step
    pub fn update(&mut self, agent: &Agent, perception: &Perception<'_>, dt: f32) -> AiUpdate {
        if agent.is_dead() {
            return AiUpdate {
                drive: Drive::stop(),
                fire_at: None,
                events: Vec::new(),
            };
        }

        let mut events = Vec::new();

        self.tick_timers(dt, &mut events);
        self.update_target_detection(agent, perception, &mut events);

        let target = self.resolve_target(perception);

        let next = self.next_behavior(agent, target.as_ref());
        if next != self.behavior {
            self.enter_state(next, &mut events);
        }

        let drive = self.update_movement(agent, target.as_ref());
        let fire_at = self.update_fire(agent, target.as_ref(), perception);

        AiUpdate {
            drive,
            fire_at,
            events,
        }
    }

    fn tick_timers(&mut self, dt: f32, events: &mut Vec<AiEvent>) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.patrol_wait_remaining = (self.patrol_wait_remaining - dt).max(0.0);

        if self.search_dwell_remaining > 0.0 {
            self.search_dwell_remaining = (self.search_dwell_remaining - dt).max(0.0);
            // Dwell at the last known location ran out: give up the hunt
            if self.search_dwell_remaining == 0.0 && self.behavior == AiBehavior::Search {
                self.clear_target(events);
            }
        }
    }

    /// Resolve the stored target id against this tick's candidates.
    /// Detection has already dropped ids that stopped resolving.
    fn resolve_target(&self, perception: &Perception<'_>) -> Option<TargetInfo> {
        let id = self.target?;
        perception.targets.iter().find(|t| t.id == id).copied()
    }

    /// Acquire the nearest candidate in detection range. Suppressed while
    /// fleeing. A target that left detection range is retained as long as
    /// it stays alive, so the search behavior has something to hunt.
    fn update_target_detection(
        &mut self,
        agent: &Agent,
        perception: &Perception<'_>,
        events: &mut Vec<AiEvent>,
    ) {
        // Drop a reference that stopped resolving, even while fleeing
        if let Some(id) = self.target {
            if !perception.targets.iter().any(|t| t.id == id) {
                self.clear_target(events);
            }
        }

        if self.behavior == AiBehavior::Flee {
            return;
        }

        if let Some(nearest) = self.find_nearest_target(agent, perception.targets) {
            if self.target != Some(nearest.id) {
                self.target = Some(nearest.id);
                events.push(AiEvent::TargetAcquired {
                    target_id: nearest.id,
                });
            }
        }
    }

    /// Closest candidate within detection range; first encountered wins
    /// at equal distance
    fn find_nearest_target(&self, agent: &Agent, targets: &[TargetInfo]) -> Option<TargetInfo> {
        let mut nearest: Option<TargetInfo> = None;
        let mut nearest_distance = f32::MAX;

        for candidate in targets {
            let distance = agent.position.distance(candidate.position);
            if distance < nearest_distance && distance <= self.settings.detection_range {
                nearest_distance = distance;
                nearest = Some(*candidate);
            }
        }

        nearest
    }

    /// Pure transition decision from (target validity, distance, health
    /// fraction, current state)
    fn next_behavior(&self, agent: &Agent, target: Option<&TargetInfo>) -> AiBehavior {
        let Some(target) = target else {
            return if self.has_patrol() {
                AiBehavior::Patrol
            } else {
                AiBehavior::Idle
            };
        };

        let mut next = self.behavior;

        // Flee wins over every combat state and is sticky: once fleeing,
        // the distance buckets are not re-evaluated until the target
        // changes
        if self.settings.can_flee
            && self.behavior != AiBehavior::Flee
            && agent.health_fraction() <= self.settings.flee_health_threshold
        {
            next = AiBehavior::Flee;
        }

        if next != AiBehavior::Flee {
            let distance = agent.position.distance(target.position);
            next = if distance <= self.settings.attack_range {
                AiBehavior::Attack
            } else if distance <= self.settings.detection_range {
                AiBehavior::Chase
            } else {
                AiBehavior::Search
            };
        }

        next
    }

    fn enter_state(&mut self, next: AiBehavior, events: &mut Vec<AiEvent>) {
        let old = self.behavior;

        // Cancel the exiting state's pending work
        match old {
            AiBehavior::Patrol => {
                self.patrol_wait_remaining = 0.0;
                self.destination = None;
            }
            AiBehavior::Search => {
                self.search_dwell_remaining = 0.0;
            }
            _ => {}
        }

        self.behavior = next;
        events.push(AiEvent::BehaviorChanged {
            new_state: next,
            old_state: old,
        });
    }

    fn clear_target(&mut self, events: &mut Vec<AiEvent>) {
        if self.target.take().is_some() {
            self.last_known_target_location = None;
            events.push(AiEvent::TargetLost);
        }
    }

    // --- Act ---

    fn update_movement(&mut self, agent: &Agent, target: Option<&TargetInfo>) -> Drive {
        match self.behavior {
            AiBehavior::Patrol => self.update_patrol(agent),
            AiBehavior::Chase => self.update_chase(agent, target),
            AiBehavior::Attack => self.update_attack(agent, target),
            AiBehavior::Flee => self.update_flee(agent, target),
            AiBehavior::Search => self.update_search(agent),
            AiBehavior::Idle => Drive::stop(),
        }
    }

    fn update_patrol(&mut self, agent: &Agent) -> Drive {
        if self.patrol_wait_remaining > 0.0 {
            return Drive::stop();
        }

        let destination = match self.destination {
            Some(destination) => destination,
            None => {
                let destination = self.next_patrol_point(agent);
                self.destination = Some(destination);
                destination
            }
        };

        if has_reached(agent.position, destination, ARRIVAL_TOLERANCE) {
            self.destination = None;
            self.patrol_wait_remaining = self.settings.patrol_wait_time;
            Drive::stop()
        } else {
            drive_towards(agent, destination)
        }
    }

    fn next_patrol_point(&mut self, agent: &Agent) -> Vec2 {
        if self.use_random_patrol {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = self.rng.gen_range(0.0..self.settings.patrol_radius);
            self.patrol_center + Vec2::new(angle.cos(), angle.sin()) * distance
        } else if !self.patrol_points.is_empty() {
            let point = self.patrol_points[self.patrol_index];
            self.patrol_index = (self.patrol_index + 1) % self.patrol_points.len();
            point
        } else {
            agent.position
        }
    }

    fn update_chase(&mut self, agent: &Agent, target: Option<&TargetInfo>) -> Drive {
        match target {
            Some(target) => {
                self.last_known_target_location = Some(target.position);
                drive_towards(agent, target.position)
            }
            None => Drive::stop(),
        }
    }

    fn update_attack(&mut self, agent: &Agent, target: Option<&TargetInfo>) -> Drive {
        let Some(target) = target else {
            return Drive::stop();
        };

        let distance = agent.position.distance(target.position);
        if distance > self.settings.attack_range * 0.8 {
            return drive_towards(agent, target.position);
        }

        // Orbit tangentially at half weapons range
        let to_target = (target.position - agent.position).normalize_or_zero();
        let tangent = Vec2::new(to_target.y, -to_target.x);
        let orbit_point = target.position + tangent * self.settings.attack_range * 0.5;
        drive_towards(agent, orbit_point)
    }

    fn update_flee(&mut self, agent: &Agent, target: Option<&TargetInfo>) -> Drive {
        let Some(target) = target else {
            return Drive::stop();
        };

        let away = (agent.position - target.position).normalize_or_zero();
        let flee_point = agent.position + away * self.settings.detection_range * 2.0;
        drive_towards(agent, flee_point)
    }

    fn update_search(&mut self, agent: &Agent) -> Drive {
        let Some(last_known) = self.last_known_target_location else {
            return self.update_patrol(agent);
        };

        if self.search_dwell_remaining > 0.0 {
            return Drive::stop();
        }

        if has_reached(agent.position, last_known, ARRIVAL_TOLERANCE) {
            self.search_dwell_remaining = self.settings.search_dwell_time;
            Drive::stop()
        } else {
            drive_towards(agent, last_known)
        }
    }

    // --- Fire ---

    fn update_fire(
        &mut self,
        agent: &Agent,
        target: Option<&TargetInfo>,
        perception: &Perception<'_>,
    ) -> Option<Vec2> {
        let target = target?;

        if !self.should_fire(agent, target, perception) {
            return None;
        }

        self.fire_cooldown = self.settings.reaction_time;
        Some(self.aim_point(agent, target))
    }

    fn should_fire(&self, agent: &Agent, target: &TargetInfo, perception: &Perception<'_>) -> bool {
        if self.fire_cooldown > 0.0 {
            return false;
        }

        let distance = agent.position.distance(target.position);
        distance <= self.settings.attack_range
            && perception
                .los
                .clear(agent.position, target.position, target.id)
    }

    /// Predictive lead plus a difficulty-scaled random cone
    fn aim_point(&mut self, agent: &Agent, target: &TargetInfo) -> Vec2 {
        let predicted = target.position + target.velocity * TARGET_LEAD_TIME;

        let to_predicted = predicted - agent.position;
        if to_predicted.length_squared() < 1.0 {
            return predicted;
        }
        let direction = to_predicted.normalize();

        let accuracy =
            self.settings.accuracy * shot_accuracy_multiplier(self.difficulty);
        let spread_deg = (1.0 - accuracy).max(0.0) * MAX_AIM_SPREAD_DEG;
        let yaw_offset = if spread_deg > 0.0 {
            self.rng.gen_range(-spread_deg..spread_deg).to_radians()
        } else {
            0.0
        };

        let aimed = Vec2::from_angle(yaw_offset).rotate(direction);
        agent.position + aimed * AIM_PROJECTION_DISTANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::agent::AgentKind;

    /// Unobstructed world
    struct OpenField;

    impl LineOfSight for OpenField {
        fn clear(&self, _from: Vec2, _to: Vec2, _target: Uuid) -> bool {
            true
        }
    }

    /// Everything is obstructed
    struct Walled;

    impl LineOfSight for Walled {
        fn clear(&self, _from: Vec2, _to: Vec2, _target: Uuid) -> bool {
            false
        }
    }

    fn ai_agent(position: Vec2) -> Agent {
        Agent::new(
            Uuid::new_v4(),
            "raider".to_string(),
            AgentKind::Ai,
            position,
            0.0,
        )
    }

    fn target_at(position: Vec2) -> TargetInfo {
        TargetInfo {
            id: Uuid::new_v4(),
            position,
            velocity: Vec2::ZERO,
        }
    }

    fn step(
        controller: &mut AiController,
        agent: &Agent,
        targets: &[TargetInfo],
        dt: f32,
    ) -> AiUpdate {
        let perception = Perception {
            targets,
            los: &OpenField,
        };
        controller.update(agent, &perception, dt)
    }

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn no_target_falls_back_to_patrol_or_idle() {
        let agent = ai_agent(Vec2::ZERO);

        let mut roaming = AiController::new(1, agent.position);
        step(&mut roaming, &agent, &[], DT);
        assert_eq!(roaming.behavior(), AiBehavior::Patrol);

        let mut fixed = AiController::new(1, agent.position);
        fixed.set_patrol_points(Vec::new());
        step(&mut fixed, &agent, &[], DT);
        assert_eq!(fixed.behavior(), AiBehavior::Idle);
    }

    #[test]
    fn distance_buckets_drive_chase_then_attack_then_flee() {
        let mut agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(2, agent.position);
        let mut target = target_at(Vec2::new(1_500.0, 0.0));

        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Chase);
        assert!(update
            .events
            .contains(&AiEvent::TargetAcquired { target_id: target.id }));

        target.position = Vec2::new(800.0, 0.0);
        step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Attack);

        // Low health forces flee regardless of distance
        agent.health = 20.0;
        step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Flee);
    }

    #[test]
    fn flee_is_sticky_until_the_target_goes_away() {
        let mut agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(3, agent.position);
        let target = target_at(Vec2::new(500.0, 0.0));

        step(&mut controller, &agent, &[target], DT);
        agent.health = 10.0;
        step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Flee);

        // Health recovers, target still present: no re-entry into combat
        agent.health = 100.0;
        for _ in 0..10 {
            step(&mut controller, &agent, &[target], DT);
            assert_eq!(controller.behavior(), AiBehavior::Flee);
        }

        // Target gone: back to patrol
        let update = step(&mut controller, &agent, &[], DT);
        assert_eq!(controller.behavior(), AiBehavior::Patrol);
        assert!(update.events.contains(&AiEvent::TargetLost));
    }

    #[test]
    fn behavior_decision_is_deterministic() {
        let agent = ai_agent(Vec2::ZERO);
        let target = target_at(Vec2::new(1_200.0, 300.0));

        let mut first = AiController::new(9, agent.position);
        let mut second = AiController::new(9, agent.position);

        for _ in 0..20 {
            let a = step(&mut first, &agent, &[target], DT);
            let b = step(&mut second, &agent, &[target], DT);
            assert_eq!(first.behavior(), second.behavior());
            assert_eq!(a.drive, b.drive);
            assert_eq!(a.fire_at, b.fire_at);
        }
    }

    #[test]
    fn nearest_target_wins_with_first_at_equal_distance() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(4, agent.position);

        let near = target_at(Vec2::new(1_000.0, 0.0));
        let tied = target_at(Vec2::new(-1_000.0, 0.0));
        let far = target_at(Vec2::new(1_900.0, 0.0));

        step(&mut controller, &agent, &[near, tied, far], DT);
        assert_eq!(controller.target(), Some(near.id));
    }

    #[test]
    fn out_of_detection_range_candidates_are_ignored() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(5, agent.position);
        let distant = target_at(Vec2::new(2_500.0, 0.0));

        step(&mut controller, &agent, &[distant], DT);
        assert_eq!(controller.target(), None);
        assert_eq!(controller.behavior(), AiBehavior::Patrol);
    }

    #[test]
    fn chase_refreshes_the_last_known_location() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(6, agent.position);
        let target = target_at(Vec2::new(1_500.0, 200.0));

        step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Chase);
        assert_eq!(controller.last_known_target_location(), Some(target.position));
    }

    #[test]
    fn attack_orbits_inside_eighty_percent_of_weapons_range() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(7, agent.position);
        let target = target_at(Vec2::new(400.0, 0.0));

        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Attack);

        // Tangential point at half weapons range, not the target itself
        let orbit_point = Vec2::new(400.0, -500.0);
        assert_eq!(update.drive, drive_towards(&agent, orbit_point));

        // Beyond 80% of weapons range the agent closes distance instead
        let far_target = target_at(Vec2::new(900.0, 0.0));
        let mut closer = AiController::new(7, agent.position);
        let update = step(&mut closer, &agent, &[far_target], DT);
        assert_eq!(closer.behavior(), AiBehavior::Attack);
        assert_eq!(update.drive, drive_towards(&agent, far_target.position));
    }

    #[test]
    fn flee_heads_directly_away_from_the_target() {
        let mut agent = ai_agent(Vec2::ZERO);
        agent.health = 10.0;
        let mut controller = AiController::new(8, agent.position);
        let target = target_at(Vec2::new(500.0, 0.0));

        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Flee);

        let flee_point = Vec2::new(-4_000.0, 0.0);
        assert_eq!(update.drive, drive_towards(&agent, flee_point));
    }

    #[test]
    fn search_hunts_the_last_known_location_then_gives_up() {
        let mut agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(10, agent.position);
        let mut target = target_at(Vec2::new(1_500.0, 0.0));

        step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Chase);

        // Target slips out of detection range but stays alive: hunt it
        target.position = Vec2::new(2_600.0, 0.0);
        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(controller.behavior(), AiBehavior::Search);
        assert_eq!(update.drive, drive_towards(&agent, Vec2::new(1_500.0, 0.0)));

        // Arrive at the last known spot: dwell there
        agent.position = Vec2::new(1_500.0, 0.0);
        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(update.drive, Drive::stop());

        // Dwell expires: target given up, back on patrol
        let update = step(&mut controller, &agent, &[target], 3.0);
        assert!(update.events.contains(&AiEvent::TargetLost));
        assert_eq!(controller.behavior(), AiBehavior::Patrol);
        assert_eq!(controller.target(), None);
    }

    #[test]
    fn patrol_walks_the_route_with_waits_between_points() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(11, agent.position);
        controller.set_patrol_points(vec![Vec2::ZERO, Vec2::new(1_000.0, 0.0)]);

        // First point is under the agent: arrive and wait
        let update = step(&mut controller, &agent, &[], DT);
        assert_eq!(controller.behavior(), AiBehavior::Patrol);
        assert_eq!(update.drive, Drive::stop());

        // Still waiting
        let update = step(&mut controller, &agent, &[], 1.0);
        assert_eq!(update.drive, Drive::stop());

        // Wait over: head for the second point
        let update = step(&mut controller, &agent, &[], 3.0);
        assert_eq!(update.drive, drive_towards(&agent, Vec2::new(1_000.0, 0.0)));
    }

    #[test]
    fn fire_control_respects_range_los_and_reaction_time() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(12, agent.position);
        let target = target_at(Vec2::new(800.0, 0.0));

        let update = step(&mut controller, &agent, &[target], DT);
        assert!(update.fire_at.is_some());

        // Rearming: no second shot inside the reaction window
        let update = step(&mut controller, &agent, &[target], DT);
        assert!(update.fire_at.is_none());

        // Reaction time elapsed: fires again
        let update = step(&mut controller, &agent, &[target], 1.0);
        assert!(update.fire_at.is_some());

        // Obstructed view holds fire
        let mut blind = AiController::new(12, agent.position);
        let perception = Perception {
            targets: &[target],
            los: &Walled,
        };
        let update = blind.update(&agent, &perception, DT);
        assert!(update.fire_at.is_none());

        // Out of weapons range holds fire
        let mut chaser = AiController::new(12, agent.position);
        let far = target_at(Vec2::new(1_500.0, 0.0));
        let update = step(&mut chaser, &agent, &[far], DT);
        assert!(update.fire_at.is_none());
    }

    #[test]
    fn expert_aim_leads_the_target_with_zero_spread() {
        let agent = ai_agent(Vec2::ZERO);
        let mut controller = AiController::new(13, agent.position);
        controller.set_difficulty(AiDifficulty::Expert);

        // Expert multipliers push effective accuracy past 1.0: no cone
        let target = TargetInfo {
            id: Uuid::new_v4(),
            position: Vec2::new(500.0, 0.0),
            velocity: Vec2::new(100.0, 0.0),
        };

        let update = step(&mut controller, &agent, &[target], DT);
        // Lead: 500 + 100 * 0.5 = 550 along +X, projected to 1000
        assert_eq!(update.fire_at, Some(Vec2::new(1_000.0, 0.0)));
    }

    #[test]
    fn difficulty_multipliers_apply_once_at_assignment() {
        let mut controller = AiController::new(14, Vec2::ZERO);
        controller.set_difficulty(AiDifficulty::Easy);

        let settings = &controller.settings;
        assert!((settings.detection_range - 1_400.0).abs() < 1e-3);
        assert!((settings.accuracy - 0.42).abs() < 1e-5);
        assert!((settings.reaction_time - 0.75).abs() < 1e-5);
        assert!(!settings.can_use_secondary);

        let mut expert = AiController::new(14, Vec2::ZERO);
        expert.set_difficulty(AiDifficulty::Expert);
        assert!(expert.settings.can_use_secondary);
    }

    #[test]
    fn dead_agents_make_no_decisions() {
        let mut agent = ai_agent(Vec2::ZERO);
        agent.alive = false;
        let mut controller = AiController::new(15, agent.position);
        let target = target_at(Vec2::new(500.0, 0.0));

        let update = step(&mut controller, &agent, &[target], DT);
        assert_eq!(update.drive, Drive::stop());
        assert!(update.fire_at.is_none());
        assert!(update.events.is_empty());
        assert_eq!(controller.behavior(), AiBehavior::Idle);
    }
}
