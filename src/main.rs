//! clip-recorder: webcam and microphone recorder widget
//!
//! The widget provides:
//! - Camera/microphone acquisition with a live preview
//! - An Idle / Recording / Stopped recording state machine
//! - Playback and download of the finished clip
//!
//! Media capture and encoding belong to the host platform and are reached
//! only through the capability traits in `platform`. This binary mounts the
//! widget on the synthetic platform and renders it in the console.

mod capture;
mod config;
mod events;
mod host;
mod lifecycle;
mod platform;
mod presentation;
mod recording;
mod widget;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::host::ConsoleHost;
use crate::lifecycle::ShutdownSignal;
use crate::platform::synthetic::SyntheticPlatform;
use crate::widget::VideoRecorder;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout belongs to the console host
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "clip-recorder starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(download_dir = ?config.download_dir, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // User actions and recorder callbacks -> widget
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    let platform = SyntheticPlatform::with_timeslice(config.timeslice);
    let mut widget = VideoRecorder::new(platform.media(), &config, input_tx.clone());

    let host = ConsoleHost::new(input_tx, widget.watch(), widget.subscribe());

    info!("widget mounted, entering main loop");

    tokio::select! {
        // Process inputs one at a time
        _ = widget.run(input_rx) => {
            info!("widget loop exited");
        }

        // Render and read commands
        result = host.run() => {
            match result {
                Ok(()) => info!("console host closed"),
                Err(e) => error!(?e, "console host error"),
            }
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to listen for shutdown signals"),
            }
        }
    }

    // Cleanup; a pending acquisition was dropped with the loop above
    info!("shutting down...");
    widget.dispose();

    info!("clip-recorder stopped");

    Ok(())
}
