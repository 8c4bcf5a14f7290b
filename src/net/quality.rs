//! Link quality classification and adaptive replication rates

use serde::{Deserialize, Serialize};

/// Connection quality tier derived from measured link statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl NetQuality {
    /// Bucket a 0-100 quality score. Tier lower bounds are inclusive.
    pub fn from_score(score: f32) -> Self {
        if score >= 80.0 {
            NetQuality::Excellent
        } else if score >= 60.0 {
            NetQuality::Good
        } else if score >= 40.0 {
            NetQuality::Fair
        } else {
            NetQuality::Poor
        }
    }
}

/// Latest link statistics reported for a connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetStatsSample {
    /// Round-trip time in milliseconds
    pub ping: f32,
    /// Packet loss as a fraction (0.05 = 5%)
    pub packet_loss: f32,
    /// Jitter in milliseconds
    pub jitter: f32,
}

/// Per-connection network statistics snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkStats {
    pub ping: f32,
    pub packet_loss: f32,
    pub jitter: f32,
    pub quality: NetQuality,
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            ping: 0.0,
            packet_loss: 0.0,
            jitter: 0.0,
            quality: NetQuality::Good,
        }
    }
}

/// Compute a 0-100 quality score from link statistics.
/// Starts at 100 and penalizes ping above 100ms, any packet loss,
/// and jitter above 50ms.
pub fn quality_score(ping: f32, packet_loss: f32, jitter: f32) -> f32 {
    let mut score = 100.0;

    if ping > 100.0 {
        score -= (ping - 100.0) * 0.5;
    }

    score -= packet_loss * 1000.0;

    if jitter > 50.0 {
        score -= (jitter - 50.0) * 0.2;
    }

    score.clamp(0.0, 100.0)
}

/// Classify link statistics into a quality tier
pub fn classify(ping: f32, packet_loss: f32, jitter: f32) -> NetQuality {
    NetQuality::from_score(quality_score(ping, packet_loss, jitter))
}

/// Global replication rate policy, read by the broadcast transport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSettings {
    /// Position updates per second
    pub position_rate: f32,
    /// Rotation updates per second
    pub rotation_rate: f32,
    /// Velocity updates per second
    pub velocity_rate: f32,
    /// Health updates per second
    pub health_rate: f32,
    /// Beyond this distance agents are not replicated (cm)
    pub max_update_distance: f32,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            position_rate: 20.0,
            rotation_rate: 20.0,
            velocity_rate: 30.0,
            health_rate: 10.0,
            max_update_distance: 10_000.0,
        }
    }
}

impl ReplicationSettings {
    /// Per-channel rate table for a quality tier. Poorer links get
    /// coarser updates across position/rotation/velocity.
    pub fn for_quality(quality: NetQuality) -> Self {
        let (position, rotation, velocity) = match quality {
            NetQuality::Poor => (10.0, 10.0, 15.0),
            NetQuality::Fair => (15.0, 15.0, 20.0),
            NetQuality::Good => (20.0, 20.0, 30.0),
            NetQuality::Excellent => (30.0, 30.0, 60.0),
        };
        Self {
            position_rate: position,
            rotation_rate: rotation,
            velocity_rate: velocity,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_penalizes_bad_links() {
        assert_eq!(quality_score(50.0, 0.0, 10.0), 100.0);
        // 200ms ping: -50
        assert_eq!(quality_score(200.0, 0.0, 0.0), 50.0);
        // 10% loss: -100, clamped to 0
        assert_eq!(quality_score(0.0, 0.1, 0.0), 0.0);
        // 150ms jitter: -20
        assert_eq!(quality_score(0.0, 0.0, 150.0), 80.0);
    }

    #[test]
    fn mid_bucket_scores() {
        assert_eq!(NetQuality::from_score(85.0), NetQuality::Excellent);
        assert_eq!(NetQuality::from_score(65.0), NetQuality::Good);
        assert_eq!(NetQuality::from_score(45.0), NetQuality::Fair);
        assert_eq!(NetQuality::from_score(25.0), NetQuality::Poor);
    }

    #[test]
    fn boundary_scores_resolve_to_higher_tier() {
        assert_eq!(NetQuality::from_score(80.0), NetQuality::Excellent);
        assert_eq!(NetQuality::from_score(60.0), NetQuality::Good);
        assert_eq!(NetQuality::from_score(40.0), NetQuality::Fair);
        assert_eq!(NetQuality::from_score(39.9), NetQuality::Poor);
    }

    #[test]
    fn rate_tables_scale_with_quality() {
        let poor = ReplicationSettings::for_quality(NetQuality::Poor);
        let excellent = ReplicationSettings::for_quality(NetQuality::Excellent);
        assert_eq!(poor.position_rate, 10.0);
        assert_eq!(poor.velocity_rate, 15.0);
        assert_eq!(excellent.position_rate, 30.0);
        assert_eq!(excellent.velocity_rate, 60.0);
        // Non-tuned channels keep their defaults
        assert_eq!(poor.health_rate, ReplicationSettings::default().health_rate);
    }

    #[test]
    fn quality_tiers_are_ordered() {
        assert!(NetQuality::Poor < NetQuality::Fair);
        assert!(NetQuality::Fair < NetQuality::Good);
        assert!(NetQuality::Good < NetQuality::Excellent);
    }
}
