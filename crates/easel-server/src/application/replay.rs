//! Join-time state replay.
//!
//! A joining viewer knows nothing; this module writes the exact instruction
//! sequence that reconstructs the server's current display state on a blank
//! remote display.  Order matters throughout: fills apply to the path built
//! by the preceding `rect`/`arc` instructions, so reordering produces a
//! visually wrong viewer even though every frame is individually valid.
//!
//! The routine is idempotent: it allocates only a transient texture buffer
//! and releases it before returning, and released indices are reused, so a
//! reconnecting viewer receives a byte-identical stream.

use easel_core::protocol::instructions::{composite, line};
use easel_core::{DisplaySurface, Instruction, LayerHandle, Timestamp};
use tracing::debug;

use crate::application::session::SessionError;
use crate::infrastructure::transport::InstructionSink;

/// Checkerboard tile geometry: a 64x64 tile with two lighter 32x32 quadrants.
const TILE_SIZE: i32 = 64;
const QUADRANT: i32 = 32;
const TILE_BASE: u8 = 0x88;
const TILE_ACCENT: u8 = 0xDD;

/// Sprite geometry: a circle centered in the 128x128 layer, stroked and
/// filled.
const BALL_CENTER: i32 = 64;
const BALL_RADIUS: i32 = 62;
const BALL_STROKE: i32 = 4;
const FULL_TURN: f64 = 6.28;

/// Streams the full current display state to one joining viewer.
///
/// The sequence is: root size, checkerboard texture, root fill, texture
/// release, sprite size, sprite geometry, then a `sync` carrying the
/// session's last-sent timestamp and a flush.
pub async fn replay_display(
    surface: &mut DisplaySurface,
    sprite_layer: LayerHandle,
    last_sent: Timestamp,
    viewer: &mut dyn InstructionSink,
) -> Result<(), SessionError> {
    let root = LayerHandle::ROOT.index();

    viewer
        .send(&Instruction::Size {
            layer: root,
            width: surface.width(),
            height: surface.height(),
        })
        .await?;

    // Paint the background through a transient texture buffer.  The handle
    // must go back to the pool even when emission fails partway.
    let texture = surface.allocate_buffer()?;
    let background = send_background(viewer, root, surface, texture).await;
    surface.release(texture);
    background?;

    // Declare the sprite and draw its geometry once; afterwards the render
    // loop only ever moves it.
    viewer
        .send(&Instruction::Size {
            layer: sprite_layer.index(),
            width: easel_core::SPRITE_SIZE,
            height: easel_core::SPRITE_SIZE,
        })
        .await?;
    viewer
        .send(&Instruction::Arc {
            layer: sprite_layer.index(),
            x: BALL_CENTER,
            y: BALL_CENTER,
            radius: BALL_RADIUS,
            start: 0.0,
            end: FULL_TURN,
            negative: false,
        })
        .await?;
    viewer
        .send(&Instruction::Close {
            layer: sprite_layer.index(),
        })
        .await?;
    viewer
        .send(&Instruction::Cstroke {
            mode: composite::OVER,
            layer: sprite_layer.index(),
            cap: line::CAP_ROUND,
            join: line::JOIN_ROUND,
            thickness: BALL_STROKE,
            red: 0x00,
            green: 0x00,
            blue: 0x00,
            alpha: 0xFF,
        })
        .await?;
    viewer
        .send(&Instruction::Cfill {
            mode: composite::OVER,
            layer: sprite_layer.index(),
            red: 0x00,
            green: 0x80,
            blue: 0x80,
            alpha: 0x80,
        })
        .await?;

    viewer
        .send(&Instruction::Sync {
            timestamp: last_sent,
        })
        .await?;
    viewer.flush().await?;

    debug!("replayed display state to joining viewer");
    Ok(())
}

/// Paints the tiled checkerboard background onto the root layer.
async fn send_background(
    viewer: &mut dyn InstructionSink,
    root: i32,
    surface: &DisplaySurface,
    texture: LayerHandle,
) -> Result<(), SessionError> {
    let tex = texture.index();

    // Base tile, then the two accent quadrants.
    viewer
        .send(&Instruction::Rect {
            layer: tex,
            x: 0,
            y: 0,
            width: TILE_SIZE,
            height: TILE_SIZE,
        })
        .await?;
    viewer
        .send(&Instruction::Cfill {
            mode: composite::OVER,
            layer: tex,
            red: TILE_BASE,
            green: TILE_BASE,
            blue: TILE_BASE,
            alpha: 0xFF,
        })
        .await?;
    viewer
        .send(&Instruction::Rect {
            layer: tex,
            x: 0,
            y: 0,
            width: QUADRANT,
            height: QUADRANT,
        })
        .await?;
    viewer
        .send(&Instruction::Cfill {
            mode: composite::OVER,
            layer: tex,
            red: TILE_ACCENT,
            green: TILE_ACCENT,
            blue: TILE_ACCENT,
            alpha: 0xFF,
        })
        .await?;
    viewer
        .send(&Instruction::Rect {
            layer: tex,
            x: QUADRANT,
            y: QUADRANT,
            width: QUADRANT,
            height: QUADRANT,
        })
        .await?;
    viewer
        .send(&Instruction::Cfill {
            mode: composite::OVER,
            layer: tex,
            red: TILE_ACCENT,
            green: TILE_ACCENT,
            blue: TILE_ACCENT,
            alpha: 0xFF,
        })
        .await?;

    // Cover the whole root layer with the tiled texture.
    viewer
        .send(&Instruction::Rect {
            layer: root,
            x: 0,
            y: 0,
            width: surface.width(),
            height: surface.height(),
        })
        .await?;
    viewer
        .send(&Instruction::Lfill {
            mode: composite::OVER,
            layer: root,
            source: tex,
        })
        .await?;

    Ok(())
}
