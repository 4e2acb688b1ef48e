mod api;
mod config;
mod discord;
mod error;
mod giveaway;
mod state;
mod types;

use std::sync::Arc;

use serenity::all::{ApplicationId, Client, GatewayIntents};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::discord::{DiscordAnnouncer, Handler};
use crate::error::Result;
use crate::giveaway::{ControllerHandle, GiveawayController};
use crate::state::SnapshotStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let health = Arc::new(HealthState::new());
    let store = SnapshotStore::new(&cfg.settings_path, &cfg.run_path);
    info!(
        "Snapshots: settings={} run={}",
        cfg.settings_path, cfg.run_path
    );

    // --- Channels ---
    let (control_tx, control_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let controller_handle = ControllerHandle::new(control_tx);

    // --- Discord client ---
    let handler = Handler::new(controller_handle.clone(), Arc::clone(&health), cfg.guild_id);
    let mut builder =
        Client::builder(&cfg.discord_token, GatewayIntents::GUILDS).event_handler(handler);
    if let Some(application_id) = cfg.application_id {
        builder = builder.application_id(ApplicationId::new(application_id));
    }
    let mut client = builder.await?;

    // --- Giveaway controller (recovers persisted state before serving requests) ---
    let announcer = DiscordAnnouncer::new(Arc::clone(&client.http), cfg.channel_id);
    let controller = GiveawayController::new(store, announcer, Arc::clone(&health), control_rx);
    tokio::spawn(async move { controller.run().await });

    // HTTP API server
    let api_state = ApiState {
        controller: controller_handle,
        health,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("[API] server stopped: {e}");
        }
    });

    info!("[DISCORD] connecting to gateway, announcements go to channel {}", cfg.channel_id);
    client.start().await?;

    Ok(())
}
