//! Client trust layer - registration, intent validation, escalation
//!
//! The single authority-side gate between an untrusted client report and any
//! state mutation. Tracks per-client violation counts and escalates repeat
//! offenders to a kick; bans are a separate, explicit path.

use std::collections::{HashSet, VecDeque};

use dashmap::DashMap;
use glam::Vec2;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::net::protocol::{PlayerAction, ServerEvent, ViolationKind};
use crate::net::quality::{classify, NetStatsSample, NetworkStats, ReplicationSettings};
use crate::util::rate_limit::ClientRateLimiter;
use crate::util::time::unix_millis;

/// Fastest plausible vehicle speed (cm/s)
pub const MAX_MOVEMENT_SPEED: f32 = 2_000.0;
/// Fastest plausible weapon fire rate (shots/s)
pub const MAX_WEAPON_FIRE_RATE: f32 = 10.0;
/// Violations before an automatic kick
pub const MAX_SUSPICIOUS_ACTIONS: u32 = 5;
/// Positional jump flagged as a teleport (cm)
pub const TELEPORT_DISTANCE: f32 = 1_000.0;
/// Time window for the teleport check (s)
pub const TELEPORT_WINDOW: f32 = 0.1;
/// Accepted gap between a claimed hit and the rewound target position (cm)
pub const HIT_TOLERANCE: f32 = 200.0;
/// Bounded per-client position history length
pub const POSITION_HISTORY_LEN: usize = 10;

/// Per-client record, owned exclusively by the trust layer
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub client_id: Uuid,
    pub display_name: String,
    pub address: String,
    pub stats: NetworkStats,
    /// Unix ms at registration
    pub connected_at: u64,
    pub validated: bool,
    pub suspicious_actions: u32,
    /// Recent accepted positions with their arrival timestamps (unix ms)
    pub position_history: VecDeque<(Vec2, u64)>,
}

impl ClientRecord {
    fn new(client_id: Uuid, display_name: String, address: String) -> Self {
        Self {
            client_id,
            display_name,
            address,
            stats: NetworkStats::default(),
            connected_at: unix_millis(),
            // Provisional until the first validation pass says otherwise
            validated: true,
            suspicious_actions: 0,
            position_history: VecDeque::with_capacity(POSITION_HISTORY_LEN),
        }
    }

    /// Most recently accepted position
    pub fn last_position(&self) -> Option<Vec2> {
        self.position_history.back().map(|(pos, _)| *pos)
    }
}

/// Registration failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("server is at capacity")]
    ServerFull,

    #[error("client is banned")]
    Banned,

    #[error("client is already registered")]
    AlreadyRegistered,
}

/// Fleet-wide registry of connected clients plus the validation pipeline
pub struct TrustLayer {
    clients: DashMap<Uuid, ClientRecord>,
    limiters: DashMap<Uuid, ClientRateLimiter>,
    banned: Mutex<HashSet<Uuid>>,
    settings: RwLock<ReplicationSettings>,
    events: broadcast::Sender<ServerEvent>,

    max_clients: usize,
    anti_cheat: bool,
    lag_compensation: bool,
    bandwidth_optimization: bool,
    max_ping_ms: f32,
    max_packet_loss: f32,
}

impl TrustLayer {
    pub fn new(config: &Config, events: broadcast::Sender<ServerEvent>) -> Self {
        Self {
            clients: DashMap::new(),
            limiters: DashMap::new(),
            banned: Mutex::new(HashSet::new()),
            settings: RwLock::new(ReplicationSettings::default()),
            events,
            max_clients: config.max_clients,
            anti_cheat: config.anti_cheat,
            lag_compensation: config.lag_compensation,
            bandwidth_optimization: config.bandwidth_optimization,
            max_ping_ms: config.max_ping_ms,
            max_packet_loss: config.max_packet_loss,
        }
    }

    // --- Client lifecycle ---

    /// Register a newly connected client. Rejects banned ids, duplicates
    /// (without touching the existing record) and registrations beyond
    /// capacity.
    pub fn register_client(
        &self,
        client_id: Uuid,
        display_name: &str,
        address: &str,
    ) -> Result<(), RegisterError> {
        if self.is_banned(client_id) {
            warn!(client_id = %client_id, "Rejected registration of banned client");
            return Err(RegisterError::Banned);
        }

        if self.clients.contains_key(&client_id) {
            warn!(client_id = %client_id, "Client already registered");
            return Err(RegisterError::AlreadyRegistered);
        }

        if self.clients.len() >= self.max_clients {
            return Err(RegisterError::ServerFull);
        }

        let record = ClientRecord::new(client_id, display_name.to_string(), address.to_string());
        self.clients.insert(client_id, record);
        self.limiters.insert(client_id, ClientRateLimiter::new());

        info!(
            client_id = %client_id,
            display_name = display_name,
            address = address,
            connected = self.clients.len(),
            "Client registered"
        );

        let _ = self.events.send(ServerEvent::ClientJoined {
            client_id,
            display_name: display_name.to_string(),
        });

        Ok(())
    }

    /// Unregister a client on leave/disconnect. No-op for unknown ids.
    pub fn unregister_client(&self, client_id: Uuid) {
        if let Some((_, record)) = self.clients.remove(&client_id) {
            self.limiters.remove(&client_id);

            info!(client_id = %client_id, "Client unregistered");

            let _ = self.events.send(ServerEvent::ClientLeft {
                client_id,
                display_name: record.display_name,
            });
        }
    }

    /// Check the per-client intent flood limiter. Unknown clients are
    /// always rejected.
    pub fn check_intent_rate(&self, client_id: Uuid) -> bool {
        self.limiters
            .get(&client_id)
            .map(|limiter| limiter.check_intent())
            .unwrap_or(false)
    }

    /// Apply a reported link statistics sample. Quality is recomputed by
    /// the periodic pass, not here.
    pub fn update_client_stats(&self, client_id: Uuid, sample: NetStatsSample) {
        if let Some(mut record) = self.clients.get_mut(&client_id) {
            record.stats.ping = sample.ping;
            record.stats.packet_loss = sample.packet_loss;
            record.stats.jitter = sample.jitter;
        }
    }

    /// A client is valid while its violation count stays under the kick
    /// threshold
    pub fn is_client_valid(&self, client_id: Uuid) -> bool {
        self.clients
            .get(&client_id)
            .map(|record| record.validated && record.suspicious_actions < MAX_SUSPICIOUS_ACTIONS)
            .unwrap_or(false)
    }

    pub fn client_info(&self, client_id: Uuid) -> Option<ClientRecord> {
        self.clients.get(&client_id).map(|record| record.clone())
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn is_banned(&self, client_id: Uuid) -> bool {
        self.banned.lock().contains(&client_id)
    }

    // --- Validation pipeline ---

    /// Screen a client-reported action. Returns false without mutating any
    /// state when the action is implausible; the caller simply does not
    /// apply the intent.
    pub fn validate_action(&self, client_id: Uuid, action: &PlayerAction) -> bool {
        if !self.anti_cheat {
            return true;
        }

        if self.is_banned(client_id) {
            return false;
        }

        if !self.is_client_valid(client_id) {
            return false;
        }

        match action {
            PlayerAction::Movement {
                position,
                delta_time,
            } => self.validate_movement(client_id, *position, *delta_time),
            PlayerAction::Weapon { weapon, fire_rate } => {
                self.validate_weapon(client_id, weapon, *fire_rate)
            }
            // Permissive default for action kinds without a screen
            PlayerAction::Other { .. } => true,
        }
    }

    /// Speed and teleport checks against the last accepted position.
    /// The first report establishes the baseline and always passes.
    pub fn validate_movement(&self, client_id: Uuid, position: Vec2, delta_time: f32) -> bool {
        if !self.anti_cheat {
            return true;
        }

        let last = self
            .clients
            .get(&client_id)
            .and_then(|record| record.last_position());

        if let Some(last) = last {
            let distance = position.distance(last);
            let speed = if delta_time > 0.0 {
                distance / delta_time
            } else {
                0.0
            };

            if speed > MAX_MOVEMENT_SPEED {
                self.report_suspicious(
                    client_id,
                    ViolationKind::SpeedHack,
                    format!("Speed: {:.2} cm/s", speed),
                );
                return false;
            }

            if distance > TELEPORT_DISTANCE && delta_time < TELEPORT_WINDOW {
                self.report_suspicious(
                    client_id,
                    ViolationKind::TeleportHack,
                    format!("Distance: {:.2} cm in {:.3} s", distance, delta_time),
                );
                return false;
            }
        }

        if let Some(mut record) = self.clients.get_mut(&client_id) {
            record.position_history.push_back((position, unix_millis()));
            while record.position_history.len() > POSITION_HISTORY_LEN {
                record.position_history.pop_front();
            }
        }

        true
    }

    /// Fire-rate check for reported weapon discharges
    pub fn validate_weapon(&self, client_id: Uuid, weapon: &str, fire_rate: f32) -> bool {
        if !self.anti_cheat {
            return true;
        }

        if fire_rate > MAX_WEAPON_FIRE_RATE {
            self.report_suspicious(
                client_id,
                ViolationKind::RapidFireHack,
                format!("Fire rate: {:.2} shots/s ({})", fire_rate, weapon),
            );
            return false;
        }

        true
    }

    // --- Escalation ---

    /// Record a violation, announce it, and kick once the counter reaches
    /// the threshold. Unknown clients are a no-op.
    pub fn report_suspicious(&self, client_id: Uuid, category: ViolationKind, details: String) {
        let count = match self.clients.get_mut(&client_id) {
            Some(mut record) => {
                record.suspicious_actions += 1;
                record.suspicious_actions
            }
            None => return,
        };

        warn!(
            client_id = %client_id,
            category = ?category,
            details = %details,
            count = count,
            "Suspicious activity"
        );

        let _ = self.events.send(ServerEvent::SuspiciousActivity {
            client_id,
            category,
            details,
        });

        if count >= MAX_SUSPICIOUS_ACTIONS {
            self.kick_client(client_id, "Too many suspicious activities");
        }
    }

    /// Remove a client for cause. Kicks do not persist: the id may
    /// reconnect. Idempotent for unknown ids.
    pub fn kick_client(&self, client_id: Uuid, reason: &str) {
        if self.clients.remove(&client_id).is_some() {
            self.limiters.remove(&client_id);

            info!(client_id = %client_id, reason = reason, "Client kicked");

            let _ = self.events.send(ServerEvent::ClientKicked {
                client_id,
                reason: reason.to_string(),
            });
        }
    }

    /// Add the id to the session ban set and disconnect it if connected.
    /// Distinct from the kick path: bans persist for the server session.
    pub fn ban_client(&self, client_id: Uuid, reason: &str) {
        self.banned.lock().insert(client_id);

        if self.clients.remove(&client_id).is_some() {
            self.limiters.remove(&client_id);
        }

        info!(client_id = %client_id, reason = reason, "Client banned");

        let _ = self.events.send(ServerEvent::ClientBanned {
            client_id,
            reason: reason.to_string(),
        });
    }

    // --- Lag compensation ---

    /// Rewind a target position by half the reporter's round-trip time
    /// using the target's recorded history. Falls back to the reported
    /// position when no history entry covers the window.
    pub fn compensate_position(&self, target_id: Uuid, position: Vec2, ping_ms: f32) -> Vec2 {
        if !self.lag_compensation {
            return position;
        }

        let rewind_ms = (ping_ms * 0.5).max(0.0) as u64;
        let target_time = unix_millis().saturating_sub(rewind_ms);

        self.clients
            .get(&target_id)
            .and_then(|record| {
                record
                    .position_history
                    .iter()
                    .min_by_key(|(_, at)| at.abs_diff(target_time))
                    .map(|(pos, _)| *pos)
            })
            .unwrap_or(position)
    }

    /// Accept a claimed hit when it lands within tolerance of the target's
    /// rewound position
    pub fn is_hit_valid(
        &self,
        target_id: Uuid,
        hit_location: Vec2,
        target_location: Vec2,
        ping_ms: f32,
    ) -> bool {
        if !self.lag_compensation {
            return true;
        }

        let compensated = self.compensate_position(target_id, target_location, ping_ms);
        hit_location.distance(compensated) < HIT_TOLERANCE
    }

    // --- Periodic passes ---

    /// Recompute quality tiers from the latest stat samples and announce
    /// changes
    pub fn update_network_quality(&self) {
        for mut entry in self.clients.iter_mut() {
            let old = entry.stats.quality;
            let new = classify(entry.stats.ping, entry.stats.packet_loss, entry.stats.jitter);

            if new != old {
                entry.stats.quality = new;

                debug!(client_id = %entry.client_id, quality = ?new, "Quality tier changed");

                let _ = self.events.send(ServerEvent::QualityChanged {
                    client_id: entry.client_id,
                    quality: new,
                });
            }
        }
    }

    /// Flag clients whose link stats sit above the configured limits.
    /// Feeds the same escalation path as the action checks.
    pub fn validate_all_clients(&self) {
        if !self.anti_cheat {
            return;
        }

        let snapshot: Vec<(Uuid, f32, f32)> = self
            .clients
            .iter()
            .map(|record| (record.client_id, record.stats.ping, record.stats.packet_loss))
            .collect();

        for (client_id, ping, packet_loss) in snapshot {
            if ping > self.max_ping_ms {
                self.report_suspicious(
                    client_id,
                    ViolationKind::HighPing,
                    format!("Ping: {:.2} ms", ping),
                );
            }

            if packet_loss > self.max_packet_loss {
                self.report_suspicious(
                    client_id,
                    ViolationKind::HighPacketLoss,
                    format!("Packet loss: {:.2}%", packet_loss * 100.0),
                );
            }
        }
    }

    /// Install the rate table for the worst connected link into the global
    /// replication settings
    pub fn optimize_replication(&self) {
        if !self.bandwidth_optimization {
            return;
        }

        let worst = self.clients.iter().map(|record| record.stats.quality).min();

        if let Some(quality) = worst {
            let table = ReplicationSettings::for_quality(quality);
            let mut settings = self.settings.write();

            if *settings != table {
                debug!(quality = ?quality, "Replication rates retuned to worst link");
                *settings = table;
            }
        }
    }

    /// Current global replication policy
    pub fn replication_settings(&self) -> ReplicationSettings {
        *self.settings.read()
    }
}
