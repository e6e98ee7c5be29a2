//! The render loop: frame pacing, simulation, and emission.
//!
//! Runs as the session's single background task for the session's lifetime:
//!
//! ```text
//! while running:
//!     frame_duration = max(30ms, viewer processing lag)
//!     sleep(frame_duration)
//!     delta_t = now - last_frame
//!     advance sprite by delta_t
//!     emit move + sync, flush
//!     last_frame = now
//! ```
//!
//! The floor keeps the frame rate near 33 fps when the viewer is healthy;
//! the lag term stretches frames when acknowledgements fall behind, so
//! emission never outpaces what the viewer can apply.
//!
//! The running flag is checked once per iteration, at the top, before the
//! sleep.  A stop requested mid-sleep therefore lets at most the one
//! in-flight frame go out, and nothing after it.  A transport failure clears
//! the flag and ends the loop: the viewer is presumed gone, and retrying
//! would only stall teardown.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use easel_core::{LayerHandle, SpriteState};
use tracing::{debug, trace};

use crate::application::emitter;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::transport::{InstructionSink, TransportError};

/// Floor for the frame duration.
pub const MIN_FRAME_DURATION: Duration = Duration::from_millis(30);

/// Everything the render loop owns or shares with its session.
///
/// The sprite is owned outright: it is mutated and read on this task only.
/// The `running` flag and `last_sent` timestamp are the only cross-task
/// state, shared with [`super::session::Session`].
pub struct RenderContext {
    pub running: Arc<AtomicBool>,
    pub sprite: SpriteState,
    pub sprite_layer: LayerHandle,
    pub last_sent: Arc<AtomicI64>,
}

/// Drives the simulation and emission until stopped or the transport fails.
pub async fn run(
    mut ctx: RenderContext,
    mut sink: Box<dyn InstructionSink>,
    clock: Arc<dyn Clock>,
) -> Result<(), TransportError> {
    let mut last_frame = clock.now();
    debug!("render loop running");

    while ctx.running.load(Ordering::Acquire) {
        let frame_duration = MIN_FRAME_DURATION.max(sink.processing_lag());
        clock.sleep(frame_duration).await;

        let now = clock.now();
        let delta_t = now - last_frame;
        ctx.sprite.advance(delta_t);
        trace!(
            "frame: delta_t={delta_t}ms position=({}, {})",
            ctx.sprite.x,
            ctx.sprite.y
        );

        if let Err(e) = emitter::emit_sprite_frame(
            sink.as_mut(),
            ctx.sprite_layer,
            &ctx.sprite,
            now,
        )
        .await
        {
            ctx.running.store(false, Ordering::Release);
            debug!("render loop stopping on transport failure");
            return Err(e);
        }

        ctx.last_sent.store(now, Ordering::Release);
        last_frame = now;
    }

    debug!("render loop stopped");
    Ok(())
}
