//! Session lifecycle: start, join, stop.
//!
//! A [`Session`] is the explicit aggregate for everything one connection
//! owns: the display surface, the sprite layer, the running flag, and the
//! handle of the background render task.  Constructing one *is* starting it,
//! so "stop before start" is unrepresentable; the remaining misuse cases
//! (double stop, join after stop) surface as [`SessionError::InvalidState`].
//!
//! ```text
//!            Session::start
//!                  │
//!              Running ──── join(viewer)*
//!                  │
//!              stop() requested
//!                  │
//!              Stopping ── waits for the render task
//!                  │
//!              Stopped ─── sprite layer released
//! ```
//!
//! Stop is cooperative: the render task observes the cleared flag at the top
//! of its next iteration, so teardown waits at most one frame duration (30ms,
//! longer under viewer lag).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use easel_core::{DisplaySurface, LayerHandle, SpriteState, SurfaceError, Timestamp};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::render_loop::{self, RenderContext};
use crate::application::replay;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::transport::{InstructionSink, TransportError};

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Layer allocation failed; the session cannot be started.
    #[error("display surface: {0}")]
    Surface(#[from] SurfaceError),

    /// A lifecycle operation was invoked out of order.
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// The viewer transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopping,
    Stopped,
}

/// One viewer-facing display session and its background render task.
pub struct Session {
    surface: DisplaySurface,
    sprite_layer: LayerHandle,
    running: Arc<AtomicBool>,
    last_sent: Arc<AtomicI64>,
    state: SessionState,
    render_task: Option<JoinHandle<Result<(), TransportError>>>,
}

impl Session {
    /// Allocates the display state and spawns the render loop.
    ///
    /// The sprite starts at the upper-left corner moving toward the
    /// lower-right; `sink` receives its position every frame from now on.
    pub async fn start(
        sink: Box<dyn InstructionSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SessionError> {
        let mut surface = DisplaySurface::new();
        let sprite_layer = surface.allocate_layer()?;

        let running = Arc::new(AtomicBool::new(true));
        let last_sent = Arc::new(AtomicI64::new(clock.now()));

        let ctx = RenderContext {
            running: Arc::clone(&running),
            sprite: SpriteState::new(),
            sprite_layer,
            last_sent: Arc::clone(&last_sent),
        };
        let render_task = tokio::spawn(render_loop::run(ctx, sink, clock));

        info!("session started; sprite on layer {}", sprite_layer.index());
        Ok(Self {
            surface,
            sprite_layer,
            running,
            last_sent,
            state: SessionState::Running,
            render_task: Some(render_task),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Timestamp of the most recently completed frame.
    pub fn last_sent_timestamp(&self) -> Timestamp {
        self.last_sent.load(Ordering::Acquire)
    }

    /// Synchronizes one joining viewer with the current display state.
    ///
    /// May be called once per viewer transport; a reconnect simply joins
    /// again with a fresh transport and receives an identical stream.
    pub async fn join(
        &mut self,
        viewer: &mut dyn InstructionSink,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Running || !self.running.load(Ordering::Acquire) {
            return Err(SessionError::InvalidState(
                "join requires a running session",
            ));
        }
        replay::replay_display(
            &mut self.surface,
            self.sprite_layer,
            self.last_sent.load(Ordering::Acquire),
            viewer,
        )
        .await
    }

    /// Requests stop, waits for the render task, and releases the display.
    ///
    /// Blocks the caller until the background task has observably
    /// terminated.  Must be called exactly once; a second call is an
    /// [`SessionError::InvalidState`].  A transport failure that already
    /// ended the render task is reported in the log, not as an error here:
    /// teardown itself succeeded and the viewer was presumed gone anyway.
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        let task = self
            .render_task
            .take()
            .ok_or(SessionError::InvalidState("session already stopped"))?;

        self.state = SessionState::Stopping;
        self.running.store(false, Ordering::Release);

        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("render task ended with transport failure: {e}"),
            Err(e) => error!("render task panicked: {e}"),
        }

        self.surface.release(self.sprite_layer);
        self.state = SessionState::Stopped;
        info!("session stopped");
        Ok(())
    }
}
