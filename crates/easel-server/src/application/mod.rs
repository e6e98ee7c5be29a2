//! Application layer: the session lifecycle and the components it drives.
//!
//! - [`session`] owns the display surface and the background render task.
//! - [`replay`] reconstructs full display state for a joining viewer.
//! - [`render_loop`] paces the simulation and triggers emission each frame.
//! - [`emitter`] translates sprite state into wire instructions.

pub mod emitter;
pub mod render_loop;
pub mod replay;
pub mod session;

pub use session::{Session, SessionError, SessionState};
