//! The display surface: an allocation and identity registry for layers.
//!
//! The surface does not render anything.  Visual content only ever exists on
//! the viewer's side, produced by the drawing instructions the server emits;
//! what the server tracks is *which* layer indices are live so that
//! instructions reference consistent identities and released indices can be
//! reused.
//!
//! Index conventions follow the wire protocol: `0` is the root layer,
//! positive indices are visible layers composited over the root, negative
//! indices are off-screen buffers (usable as fill sources, never displayed).
//!
//! Released indices go to a free pool and are handed out again before any new
//! index is minted.  Reuse keeps the instruction stream reproducible: a
//! second viewer joining after a first sees exactly the same indices.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::{trace, warn};

/// Width of the root layer in pixels.  Fixed for the lifetime of a surface.
pub const ROOT_WIDTH: i32 = 1024;

/// Height of the root layer in pixels.  Fixed for the lifetime of a surface.
pub const ROOT_HEIGHT: i32 = 768;

/// Errors that can occur during layer allocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// No layer index remains.  Requires billions of live layers, but the
    /// outcome is defined rather than a wrapping index collision.
    #[error("layer handle space exhausted")]
    ResourceExhausted,
}

/// Opaque handle to a layer or buffer allocated from a [`DisplaySurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(i32);

impl LayerHandle {
    /// The root layer.  Always present; never allocated or released.
    pub const ROOT: LayerHandle = LayerHandle(0);

    /// The raw wire index of this layer.
    pub fn index(self) -> i32 {
        self.0
    }

    /// `true` for off-screen buffers (negative indices).
    pub fn is_buffer(self) -> bool {
        self.0 < 0
    }
}

/// Registry of live layers and buffers for one session's display.
///
/// The root layer is implicit and fixed at [`ROOT_WIDTH`]×[`ROOT_HEIGHT`].
/// Every other handle must be released exactly once, by whoever allocated it.
#[derive(Debug)]
pub struct DisplaySurface {
    next_layer_index: i32,
    next_buffer_index: i32,
    free_layers: VecDeque<i32>,
    free_buffers: VecDeque<i32>,
    active: HashSet<i32>,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self {
            next_layer_index: 1,
            next_buffer_index: -1,
            free_layers: VecDeque::new(),
            free_buffers: VecDeque::new(),
            active: HashSet::new(),
        }
    }

    /// Width of the root layer in pixels.
    pub fn width(&self) -> i32 {
        ROOT_WIDTH
    }

    /// Height of the root layer in pixels.
    pub fn height(&self) -> i32 {
        ROOT_HEIGHT
    }

    /// Allocates a visible layer, reusing a released index when one exists.
    pub fn allocate_layer(&mut self) -> Result<LayerHandle, SurfaceError> {
        let index = match self.free_layers.pop_front() {
            Some(index) => index,
            None => {
                if self.next_layer_index == i32::MAX {
                    return Err(SurfaceError::ResourceExhausted);
                }
                let index = self.next_layer_index;
                self.next_layer_index += 1;
                index
            }
        };
        self.active.insert(index);
        trace!("allocated layer {index}");
        Ok(LayerHandle(index))
    }

    /// Allocates an off-screen buffer, reusing a released index when one
    /// exists.
    pub fn allocate_buffer(&mut self) -> Result<LayerHandle, SurfaceError> {
        let index = match self.free_buffers.pop_front() {
            Some(index) => index,
            None => {
                if self.next_buffer_index == i32::MIN {
                    return Err(SurfaceError::ResourceExhausted);
                }
                let index = self.next_buffer_index;
                self.next_buffer_index -= 1;
                index
            }
        };
        self.active.insert(index);
        trace!("allocated buffer {index}");
        Ok(LayerHandle(index))
    }

    /// Returns a handle to the free pool.
    ///
    /// Each handle must be released exactly once.  Releasing the root or a
    /// handle that is not live is a caller bug; it is logged and ignored so
    /// the registry stays consistent.
    pub fn release(&mut self, handle: LayerHandle) {
        if handle == LayerHandle::ROOT {
            warn!("attempted to release the root layer");
            return;
        }
        if !self.active.remove(&handle.0) {
            warn!("released layer {} which was not live", handle.0);
            return;
        }
        if handle.is_buffer() {
            self.free_buffers.push_back(handle.0);
        } else {
            self.free_layers.push_back(handle.0);
        }
        trace!("released layer {}", handle.0);
    }

    /// Number of live (allocated, unreleased) handles, excluding the root.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// `true` if `handle` is currently live.
    pub fn is_active(&self, handle: LayerHandle) -> bool {
        self.active.contains(&handle.0)
    }
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new()
    }
}
