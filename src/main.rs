//! Car Game Server - authoritative simulation core for multiplayer
//! vehicular combat
//!
//! This is the main entry point for the headless server. It drives:
//! - The fixed-step world tick (AI controllers + vehicle kinematics)
//! - The client trust layer (intent validation, escalation, bans)
//! - Quality-adaptive replication rate tuning
//!
//! Session transport is an external collaborator: peers register through
//! the trust layer and submit intents over the world's input channel.

mod app;
mod config;
mod game;
mod net;
mod util;

use glam::Vec2;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::game::world::{Obstacle, ObstacleField};
use crate::util::time::{init_server_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Car Game Server");
    info!(
        max_clients = config.max_clients,
        anti_cheat = config.anti_cheat,
        difficulty = ?config.ai_difficulty,
        "Server configuration loaded"
    );

    // Static arena blockers, queried by line-of-sight checks
    let arena = ObstacleField::new(vec![
        Obstacle {
            position: Vec2::new(1_500.0, 1_500.0),
            radius: 400.0,
        },
        Obstacle {
            position: Vec2::new(-2_000.0, 500.0),
            radius: 600.0,
        },
    ]);

    // Create application state and the world it drives
    let (state, mut world) = AppState::new(config.clone(), arena);

    // Seed the arena with AI vehicles spread around the origin
    for n in 0..config.ai_count {
        let angle = n as f32 / config.ai_count.max(1) as f32 * std::f32::consts::TAU;
        let position = Vec2::new(angle.cos(), angle.sin()) * 3_000.0;
        world.spawn_ai_agent(&format!("raider-{n}"), position, angle, config.ai_difficulty);
    }

    // Spawn the authoritative tick loop
    let world_task = tokio::spawn(async move {
        world.run().await;
    });

    // Mirror broadcast events into the log until a transport attaches
    let mut events_rx = state.world.subscribe();
    let events_task = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(event) => debug!(?event, "Broadcast event"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "Event logger lagged, skipping {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("World loop running, awaiting shutdown signal");

    shutdown_signal().await;

    world_task.abort();
    events_task.abort();

    info!(uptime_secs = uptime_secs(), "Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
