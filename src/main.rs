//! VRChaos headless host
//!
//! Runs one authoritative match with bot participants:
//! - loads configuration from the environment
//! - spawns `BOT_COUNT` bots into the configured game mode
//! - ticks the match until it ends, times out, or a shutdown signal arrives

use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vrchaos_core::config::Config;
use vrchaos_core::game::{MatchHost, RecordingLobby};
use vrchaos_core::net::CryptidKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    let seed = config
        .match_seed
        .unwrap_or_else(|| rand::thread_rng().gen());
    info!(mode = %config.game_mode, bots = config.bot_count, seed, "Starting VRChaos host");

    let mut host = MatchHost::new(&config, seed, Box::new(RecordingLobby::new()));
    for i in 0..config.bot_count {
        let index = (i % CryptidKind::ROSTER.len()) as i32;
        if let Err(e) = host.add_bot(index) {
            warn!(error = %e, "Bot not added");
        }
    }

    let summary = host.run(shutdown_signal()).await;
    info!(summary = %serde_json::to_string(&summary)?, "Match summary");

    info!("Host shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
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
