//! Configuration module - environment variable parsing

use std::env;

use crate::net::protocol::AiDifficulty;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Maximum number of connected clients
    pub max_clients: usize,
    /// Master switch for the anti-cheat validation pipeline
    pub anti_cheat: bool,
    /// Master switch for lag-compensated hit validation
    pub lag_compensation: bool,
    /// Master switch for quality-adaptive replication tuning
    pub bandwidth_optimization: bool,
    /// Ping above this is flagged during the periodic validation pass (ms)
    pub max_ping_ms: f32,
    /// Packet loss above this fraction is flagged during the periodic pass
    pub max_packet_loss: f32,

    /// Seed for deterministic AI randomness
    pub world_seed: u64,
    /// Difficulty tier applied to spawned AI agents
    pub ai_difficulty: AiDifficulty,
    /// Number of AI agents spawned at startup
    pub ai_count: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Every variable has a default so a headless server boots with an
    /// empty environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            max_clients: parse_var("MAX_CLIENTS", 8)?,
            anti_cheat: parse_var("ANTI_CHEAT", true)?,
            lag_compensation: parse_var("LAG_COMPENSATION", true)?,
            bandwidth_optimization: parse_var("BANDWIDTH_OPT", true)?,
            max_ping_ms: parse_var("MAX_PING_MS", 200.0)?,
            max_packet_loss: parse_var("MAX_PACKET_LOSS", 0.05)?,

            world_seed: parse_var("WORLD_SEED", 0)?,
            ai_difficulty: parse_difficulty(env::var("AI_DIFFICULTY").ok())?,
            ai_count: parse_var("AI_COUNT", 4)?,
        })
    }
}

/// Parse an env var with a fallback default
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn parse_difficulty(raw: Option<String>) -> Result<AiDifficulty, ConfigError> {
    match raw.as_deref() {
        None => Ok(AiDifficulty::Medium),
        Some("easy") => Ok(AiDifficulty::Easy),
        Some("medium") => Ok(AiDifficulty::Medium),
        Some("hard") => Ok(AiDifficulty::Hard),
        Some("expert") => Ok(AiDifficulty::Expert),
        Some(_) => Err(ConfigError::Invalid("AI_DIFFICULTY")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_known_tiers() {
        assert_eq!(
            parse_difficulty(Some("expert".to_string())).unwrap(),
            AiDifficulty::Expert
        );
        assert_eq!(parse_difficulty(None).unwrap(), AiDifficulty::Medium);
        assert!(parse_difficulty(Some("nightmare".to_string())).is_err());
    }
}
