//! Domain module containing the display-surface registry and the sprite
//! simulation.  Pure state, no I/O.

pub mod sprite;
pub mod surface;

pub use sprite::SpriteState;
pub use surface::{DisplaySurface, LayerHandle, SurfaceError};
