//! focusd: background daemon for a focus-session timer with spoken check-ins
//!
//! The daemon owns the session state machine: a configurable session split
//! into intervals, each ending in a voice check-in whose transcript lands in
//! an append-only session log. UI and recognizer clients connect over a Unix
//! socket; the recognizer performs the actual speech-to-text work and submits
//! transcripts back.

mod capture;
mod clock;
mod config;
mod events;
mod ipc;
mod lifecycle;
mod session;
mod timer;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::capture::bridge_pair;
use crate::clock::Clock;
use crate::config::{Config, SessionConfig};
use crate::events::SessionEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::session::{Action, CheckInController, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "focusd starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication
    // Clock -> controller
    let (tick_tx, tick_rx) = mpsc::channel(32);
    // Capture bridge -> controller
    let (capture_tx, capture_rx) = mpsc::channel(8);
    // IPC server -> controller
    let (command_tx, command_rx) = mpsc::channel(32);
    // Controller -> subscribed IPC clients
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);
    // Capture bridge -> recognizer client
    let (prompt_tx, _prompt_rx) = broadcast::channel(16);

    // Wire the capture boundary: the controller talks to the bridge, the
    // IPC server feeds recognizer results back through the submitter
    let (capture_bridge, capture_submitter) = bridge_pair(capture_tx, prompt_tx.clone());

    // Create the controller with default durations (1h session, 25m intervals)
    let controller = CheckInController::new(
        SessionConfig::default(),
        Clock::new(tick_tx),
        capture_bridge,
        event_tx.clone(),
    );

    // Create the IPC server
    let server = Server::new(
        &config.socket_path,
        command_tx.clone(),
        capture_submitter,
        event_tx,
        prompt_tx,
    )?;

    // Run the controller on its own task; it owns all session state
    let controller_task = tokio::spawn(controller.run(tick_rx, capture_rx, command_rx));

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }
        cause = shutdown.wait() => {
            info!(signal = %cause, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    // Freeze the session, then close the command channel so the controller
    // releases the tick source and cancels any in-flight capture
    let _ = command_tx
        .send(Command {
            action: Action::ExitSession,
            reply: None,
        })
        .await;
    drop(command_tx);
    drop(server);
    if let Err(e) = controller_task.await {
        error!(?e, "controller task panicked");
    }

    info!("focusd stopped");

    Ok(())
}
