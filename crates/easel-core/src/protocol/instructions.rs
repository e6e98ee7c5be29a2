//! The server's wire-instruction vocabulary.
//!
//! Every visual change reaches the viewer as one atomic drawing or
//! state-update instruction.  The [`Instruction`] enum covers everything the
//! server emits; inbound traffic (handshake declarations, sync
//! acknowledgements) is handled at the loose [`crate::protocol::Frame`]
//! level because viewers may send opcodes the server does not model.

// ── Protocol constants ────────────────────────────────────────────────────────

/// Protocol version string exchanged during the handshake.
pub const PROTOCOL_VERSION: &str = "VERSION_1_1_0";

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 4822;

/// Milliseconds since the Unix epoch, as carried by `sync` instructions.
pub type Timestamp = i64;

/// Channel-compositing operations, as sent in `cfill`/`lfill`/`cstroke`.
pub mod composite {
    /// Porter-Duff "source over destination".  The only mode this server emits.
    pub const OVER: u8 = 0x0E;
}

/// Line cap and join styles, as sent in `cstroke`.
pub mod line {
    pub const CAP_BUTT: u8 = 0x0;
    pub const CAP_ROUND: u8 = 0x1;
    pub const CAP_SQUARE: u8 = 0x2;

    pub const JOIN_BEVEL: u8 = 0x0;
    pub const JOIN_MITER: u8 = 0x1;
    pub const JOIN_ROUND: u8 = 0x2;
}

// ── Instruction enum ──────────────────────────────────────────────────────────

/// All instructions the server emits, discriminated by opcode.
///
/// Layer arguments are raw indices: `0` is the root (default) layer, positive
/// indices are visible layers, negative indices are off-screen buffers.  See
/// [`crate::domain::surface::LayerHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Handshake: lists the names of the connection arguments this server
    /// accepts, preceded by the protocol version.
    Args { names: Vec<String> },
    /// Declares the size of a layer in pixels.
    Size { layer: i32, width: i32, height: i32 },
    /// Adds a rectangle to the current path of a layer.
    Rect {
        layer: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// Fills the current path with a constant color.
    Cfill {
        mode: u8,
        layer: i32,
        red: u8,
        green: u8,
        blue: u8,
        alpha: u8,
    },
    /// Fills the current path with the contents of another layer, tiled.
    Lfill { mode: u8, layer: i32, source: i32 },
    /// Adds a circular arc to the current path of a layer.  Angles are in
    /// radians; `negative` selects the winding direction.
    Arc {
        layer: i32,
        x: i32,
        y: i32,
        radius: i32,
        start: f64,
        end: f64,
        negative: bool,
    },
    /// Closes the current path of a layer.
    Close { layer: i32 },
    /// Strokes the current path with a constant color.
    Cstroke {
        mode: u8,
        layer: i32,
        cap: u8,
        join: u8,
        thickness: i32,
        red: u8,
        green: u8,
        blue: u8,
        alpha: u8,
    },
    /// Repositions a layer relative to its parent.  `z` orders siblings.
    Move {
        layer: i32,
        parent: i32,
        x: i32,
        y: i32,
        z: i32,
    },
    /// Frame boundary.  Everything since the previous `sync` forms one
    /// logically atomic batch the viewer may apply at once; the timestamp is
    /// echoed back by the viewer as a processing acknowledgement.
    Sync { timestamp: Timestamp },
    /// Handshake: the connection is established; carries the connection ID a
    /// later viewer may `select` to join this session.
    Ready { connection_id: String },
    /// The connection is being closed deliberately.
    Disconnect,
}

impl Instruction {
    /// Returns the wire opcode for this instruction.
    pub fn opcode(&self) -> &'static str {
        match self {
            Instruction::Args { .. } => "args",
            Instruction::Size { .. } => "size",
            Instruction::Rect { .. } => "rect",
            Instruction::Cfill { .. } => "cfill",
            Instruction::Lfill { .. } => "lfill",
            Instruction::Arc { .. } => "arc",
            Instruction::Close { .. } => "close",
            Instruction::Cstroke { .. } => "cstroke",
            Instruction::Move { .. } => "move",
            Instruction::Sync { .. } => "sync",
            Instruction::Ready { .. } => "ready",
            Instruction::Disconnect => "disconnect",
        }
    }

    /// Renders the argument list in wire order, as decimal/string elements.
    pub fn wire_args(&self) -> Vec<String> {
        match self {
            Instruction::Args { names } => names.clone(),
            Instruction::Size {
                layer,
                width,
                height,
            } => vec![layer.to_string(), width.to_string(), height.to_string()],
            Instruction::Rect {
                layer,
                x,
                y,
                width,
                height,
            } => vec![
                layer.to_string(),
                x.to_string(),
                y.to_string(),
                width.to_string(),
                height.to_string(),
            ],
            Instruction::Cfill {
                mode,
                layer,
                red,
                green,
                blue,
                alpha,
            } => vec![
                mode.to_string(),
                layer.to_string(),
                red.to_string(),
                green.to_string(),
                blue.to_string(),
                alpha.to_string(),
            ],
            Instruction::Lfill {
                mode,
                layer,
                source,
            } => vec![mode.to_string(), layer.to_string(), source.to_string()],
            Instruction::Arc {
                layer,
                x,
                y,
                radius,
                start,
                end,
                negative,
            } => {
                let winding = if *negative { "1" } else { "0" };
                vec![
                    layer.to_string(),
                    x.to_string(),
                    y.to_string(),
                    radius.to_string(),
                    start.to_string(),
                    end.to_string(),
                    winding.to_string(),
                ]
            }
            Instruction::Close { layer } => vec![layer.to_string()],
            Instruction::Cstroke {
                mode,
                layer,
                cap,
                join,
                thickness,
                red,
                green,
                blue,
                alpha,
            } => vec![
                mode.to_string(),
                layer.to_string(),
                cap.to_string(),
                join.to_string(),
                thickness.to_string(),
                red.to_string(),
                green.to_string(),
                blue.to_string(),
                alpha.to_string(),
            ],
            Instruction::Move {
                layer,
                parent,
                x,
                y,
                z,
            } => vec![
                layer.to_string(),
                parent.to_string(),
                x.to_string(),
                y.to_string(),
                z.to_string(),
            ],
            Instruction::Sync { timestamp } => vec![timestamp.to_string()],
            Instruction::Ready { connection_id } => vec![connection_id.clone()],
            Instruction::Disconnect => Vec::new(),
        }
    }
}
