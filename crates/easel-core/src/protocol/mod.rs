//! Protocol module containing the instruction vocabulary and the text codec.

pub mod codec;
pub mod instructions;

pub use codec::{decode_instruction, encode_frame, encode_instruction, Decoder, Frame, ProtocolError};
pub use instructions::*;
