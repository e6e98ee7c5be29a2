//! Frame emission: sprite state to wire instructions.
//!
//! Stateless by design.  After the join replay has declared the sprite's
//! geometry, a position change is a single `move`; geometry is never
//! re-declared.  Each frame ends with a `sync` carrying the frame timestamp
//! so the viewer can apply the batch atomically and acknowledge it.

use easel_core::{Instruction, LayerHandle, SpriteState, Timestamp};

use crate::infrastructure::transport::{InstructionSink, TransportError};

/// Emits one complete frame for the current sprite position and flushes.
///
/// An error aborts the remainder of the frame immediately; nothing further
/// is written for this frame.
pub async fn emit_sprite_frame(
    sink: &mut dyn InstructionSink,
    sprite_layer: LayerHandle,
    sprite: &SpriteState,
    timestamp: Timestamp,
) -> Result<(), TransportError> {
    sink.send(&Instruction::Move {
        layer: sprite_layer.index(),
        parent: LayerHandle::ROOT.index(),
        x: sprite.x,
        y: sprite.y,
        z: 0,
    })
    .await?;
    sink.send(&Instruction::Sync { timestamp }).await?;
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::mock::RecordingSink;
    use crate::infrastructure::transport::MockInstructionSink;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_frame_is_move_then_sync_then_flush() {
        let mut sink = MockInstructionSink::new();
        let mut seq = Sequence::new();
        sink.expect_send()
            .once()
            .in_sequence(&mut seq)
            .withf(|ins| matches!(ins, Instruction::Move { x: 200, y: 150, .. }))
            .returning(|_| Ok(()));
        sink.expect_send()
            .once()
            .in_sequence(&mut seq)
            .withf(|ins| matches!(ins, Instruction::Sync { timestamp: 1_030 }))
            .returning(|_| Ok(()));
        sink.expect_flush()
            .once()
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let sprite = SpriteState {
            x: 200,
            y: 150,
            velocity_x: 200,
            velocity_y: 200,
        };
        let mut surface = easel_core::DisplaySurface::new();
        let layer = surface.allocate_layer().unwrap();

        emit_sprite_frame(&mut sink, layer, &sprite, 1_030)
            .await
            .expect("emission must succeed");
    }

    #[tokio::test]
    async fn test_frame_references_sprite_layer_and_root_parent() {
        let mut sink = RecordingSink::new();
        let mut surface = easel_core::DisplaySurface::new();
        let layer = surface.allocate_layer().unwrap();
        let sprite = SpriteState::new();

        emit_sprite_frame(&mut sink, layer, &sprite, 0)
            .await
            .unwrap();

        assert_eq!(
            sink.frames(),
            vec!["4.move,1.1,1.0,1.0,1.0,1.0;", "4.sync,1.0;"]
        );
        assert_eq!(sink.flush_count(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_aborts_the_frame() {
        let mut sink = MockInstructionSink::new();
        sink.expect_send()
            .once()
            .returning(|_| Err(TransportError::Closed));
        // No sync, no flush after the failed move.

        let mut surface = easel_core::DisplaySurface::new();
        let layer = surface.allocate_layer().unwrap();
        let result = emit_sprite_frame(&mut sink, layer, &SpriteState::new(), 0).await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
