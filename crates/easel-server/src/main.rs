//! Easel server entry point.
//!
//! Accepts one viewer, negotiates the handshake, starts the display session,
//! and tears everything down when the viewer leaves.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, bind listener, accept one connection
//!  └─ handshake::negotiate      -- select / args / connect / ready
//!  └─ Session::start            -- spawns the render loop task
//!  └─ Session::join             -- replays display state to the viewer
//!  └─ watch_viewer              -- consumes acks until disconnect/timeout
//!  └─ Session::stop             -- joins the render task, frees the display
//! ```
//!
//! A single connection is deliberate: it keeps the whole lifecycle,
//! including cleanup, visible in one pass.  Serving viewers back to back
//! would wrap the accept in a loop.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use easel_core::Instruction;
use easel_server::application::Session;
use easel_server::infrastructure::clock::{Clock, SystemClock};
use easel_server::infrastructure::config::{ServerConfig, DEFAULT_CONFIG_PATH};
use easel_server::infrastructure::handshake::{self, ServerIdentity};
use easel_server::infrastructure::transport::{
    watch_viewer, FrameReader, InstructionSink, StreamSink, SyncTracker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging is up, so the configured level can
    // seed the filter; any load problem is reported right after.
    let config_path = Path::new(DEFAULT_CONFIG_PATH);
    let (config, config_note) = load_config(config_path);

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if let Some(note) = config_note {
        warn!("{note}; continuing with defaults");
    }

    info!("easel server starting");

    let clock = SystemClock;
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!("waiting for a viewer on {}", config.bind_addr());

    let (stream, peer) = listener
        .accept()
        .await
        .context("failed to accept connection")?;
    info!("accepted connection from {peer}");

    let (read_half, write_half) = stream.into_split();
    let tracker = Arc::new(SyncTracker::new(clock.now()));
    let sink = StreamSink::new(write_half, Arc::clone(&tracker));
    let mut reader = FrameReader::new(read_half);

    let identity = ServerIdentity::new(&config.server.protocol_name);
    let mut handshake_sink = sink.clone();
    let viewer_info = handshake::negotiate(
        &mut reader,
        &mut handshake_sink,
        &identity,
        config.handshake_timeout(),
    )
    .await
    .context("handshake failed")?;
    if let Some((width, height)) = viewer_info.optimal_size {
        // The root layer stays 1024x768; the declared size is informational.
        debug!("viewer prefers {width}x{height}");
    }

    let mut session = Session::start(Box::new(sink.clone()), Arc::new(clock))
        .await
        .context("failed to start session")?;
    let mut viewer_sink = sink.clone();
    session
        .join(&mut viewer_sink)
        .await
        .context("failed to synchronize viewer")?;
    info!("viewer synchronized; streaming frames");

    tokio::select! {
        exit = watch_viewer(&mut reader, &tracker, config.viewer_timeout()) => {
            info!("{exit}");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    session.stop().await.context("failed to stop session")?;

    // Best effort: the viewer may already be gone.
    let mut closing_sink = sink;
    if closing_sink.send(&Instruction::Disconnect).await.is_ok() {
        let _ = closing_sink.flush().await;
    }

    info!("done");
    Ok(())
}

/// Loads the config file when present; problems are deferred to the caller
/// so they can be logged once the subscriber is installed.
fn load_config(path: &Path) -> (ServerConfig, Option<String>) {
    if !path.exists() {
        return (ServerConfig::default(), None);
    }
    match ServerConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (ServerConfig::default(), Some(e.to_string())),
    }
}
