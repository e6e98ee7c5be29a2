//! # easel-core
//!
//! Shared library for Easel containing the wire-instruction vocabulary and
//! text codec, the display-surface layer registry, and the sprite simulation.
//!
//! This crate is used by the server application and by tooling.  It has zero
//! dependencies on OS APIs, network sockets, or an async runtime.
//!
//! Easel is a push-based remote-display server: it holds authoritative
//! display state on the server side and streams drawing instructions to a
//! connected viewer so that the viewer's rendered picture stays in sync.
//! This crate defines:
//!
//! - **`protocol`** – How instructions travel over the wire.  Each
//!   instruction is a length-prefixed text frame (`4.size,1.0,4.1024,3.768;`)
//!   that can be encoded from a typed [`Instruction`] and decoded back from a
//!   byte stream.
//!
//! - **`domain`** – Pure display-state logic with no I/O.  The
//!   [`DisplaySurface`] hands out layer and buffer handles; the
//!   [`SpriteState`] advances a bouncing sprite by a wall-clock delta and
//!   reflects it off the field edges.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `easel_core::Instruction` instead of `easel_core::protocol::instructions::Instruction`.
pub use domain::sprite::{SpriteState, INITIAL_VELOCITY, SPRITE_SIZE};
pub use domain::surface::{DisplaySurface, LayerHandle, SurfaceError, ROOT_HEIGHT, ROOT_WIDTH};
pub use protocol::codec::{
    decode_instruction, encode_frame, encode_instruction, Decoder, Frame, ProtocolError,
};
pub use protocol::instructions::{Instruction, Timestamp, DEFAULT_PORT, PROTOCOL_VERSION};
