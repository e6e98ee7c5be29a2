//! Text codec for encoding and decoding wire instructions.
//!
//! Wire format:
//! ```text
//! ELEMENT := LENGTH "." VALUE        LENGTH = number of characters in VALUE
//! FRAME   := ELEMENT ("," ELEMENT)* ";"
//! ```
//! The first element of a frame is the opcode, the remaining elements are its
//! arguments.  For example a root-layer size declaration is
//! `4.size,1.0,4.1024,3.768;`.  Lengths count Unicode characters, not bytes,
//! so a frame survives any transport that preserves UTF-8.
//!
//! Two representations exist on the receive path:
//!
//! - [`Frame`] is the loose unit a [`Decoder`] yields: opcode plus raw string
//!   arguments.  Handshake and acknowledgement handling works on frames, so
//!   unknown viewer opcodes can be skipped instead of failing the connection.
//! - [`Instruction`] is the typed form; [`decode_instruction`] converts a
//!   frame with full arity and range checking.

use crate::protocol::instructions::Instruction;
use thiserror::Error;

/// Upper bound on the characters in a single frame, matching the original
/// protocol's instruction cap.  Anything longer is a framing error.
pub const MAX_FRAME_CHARS: usize = 8192;

/// Byte-level guard for the decode buffer; a frame of `MAX_FRAME_CHARS`
/// worst-case UTF-8 characters cannot exceed this.
const MAX_FRAME_BYTES: usize = MAX_FRAME_CHARS * 4;

/// Errors that can occur while framing, parsing, or typing instructions.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// An element did not start with a decimal length prefix followed by `.`.
    #[error("malformed element length: unexpected {found:?}")]
    MalformedLength { found: char },

    /// A frame or element exceeded [`MAX_FRAME_CHARS`].
    #[error("frame exceeds {MAX_FRAME_CHARS} characters")]
    FrameTooLong,

    /// An element was not followed by `,` or `;`.
    #[error("expected ',' or ';' after element, found {found:?}")]
    BadDelimiter { found: char },

    /// The opcode is not part of the typed instruction vocabulary.
    #[error("unknown opcode: {0:?}")]
    UnknownOpcode(String),

    /// The frame carries the wrong number of arguments for its opcode.
    #[error("{opcode}: expected {expected} arguments, got {actual}")]
    WrongArgumentCount {
        opcode: String,
        expected: usize,
        actual: usize,
    },

    /// An argument could not be parsed as the expected type.
    #[error("{opcode}: malformed argument {index}: {value:?}")]
    MalformedArgument {
        opcode: String,
        index: usize,
        value: String,
    },
}

/// One parsed wire frame: an opcode and its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: String,
    pub args: Vec<String>,
}

impl Frame {
    pub fn new(opcode: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            opcode: opcode.into(),
            args,
        }
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes one frame from an opcode and raw argument strings.
pub fn encode_frame(opcode: &str, args: &[String]) -> String {
    let mut out = String::new();
    push_element(&mut out, opcode);
    for arg in args {
        out.push(',');
        push_element(&mut out, arg);
    }
    out.push(';');
    out
}

/// Encodes a typed [`Instruction`] into its wire form.
///
/// # Examples
///
/// ```rust
/// use easel_core::protocol::{encode_instruction, Instruction};
///
/// let ins = Instruction::Size { layer: 0, width: 1024, height: 768 };
/// assert_eq!(encode_instruction(&ins), "4.size,1.0,4.1024,3.768;");
/// ```
pub fn encode_instruction(instruction: &Instruction) -> String {
    encode_frame(instruction.opcode(), &instruction.wire_args())
}

fn push_element(out: &mut String, value: &str) {
    out.push_str(&value.chars().count().to_string());
    out.push('.');
    out.push_str(value);
}

// ── Streaming decoder ─────────────────────────────────────────────────────────

/// Incremental frame parser.
///
/// Feed it bytes as they arrive from the transport; [`Decoder::next_frame`]
/// yields `Ok(Some(frame))` once a complete frame is buffered, `Ok(None)`
/// when more input is needed.  Frames may be split at arbitrary byte
/// boundaries, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes from the transport to the parse buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Attempts to parse one complete frame from the front of the buffer.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        // Parse only the valid UTF-8 prefix; a chunk boundary can split a
        // multi-byte character.
        let valid = match std::str::from_utf8(&self.buffer) {
            Ok(s) => s,
            Err(e) => std::str::from_utf8(&self.buffer[..e.valid_up_to()])
                .expect("prefix up to the error offset is valid UTF-8"),
        };

        let mut elements: Vec<String> = Vec::new();
        let mut pos = 0usize; // byte offset of the next unparsed element

        let consumed = loop {
            let rest = &valid[pos..];

            // Length prefix: one or more ASCII digits, then '.'
            let Some(digits_end) = rest.find(|c: char| !c.is_ascii_digit()) else {
                return self.need_more();
            };
            if digits_end == 0 {
                let found = rest.chars().next().expect("rest is non-empty here");
                return Err(ProtocolError::MalformedLength { found });
            }
            let length: usize = rest[..digits_end]
                .parse()
                .map_err(|_| ProtocolError::FrameTooLong)?;
            if length > MAX_FRAME_CHARS {
                return Err(ProtocolError::FrameTooLong);
            }
            let sep = rest[digits_end..].chars().next().expect("non-empty");
            if sep != '.' {
                return Err(ProtocolError::MalformedLength { found: sep });
            }

            // Value: exactly `length` characters.
            let value_start = digits_end + 1;
            let mut value_bytes = if length == 0 { Some(0) } else { None };
            if length > 0 {
                let mut seen = 0usize;
                for (idx, ch) in rest[value_start..].char_indices() {
                    seen += 1;
                    if seen == length {
                        value_bytes = Some(idx + ch.len_utf8());
                        break;
                    }
                }
            }
            let Some(value_bytes) = value_bytes else {
                return self.need_more();
            };
            let value = &rest[value_start..value_start + value_bytes];

            // Delimiter: ',' continues the frame, ';' terminates it.
            let delim_at = value_start + value_bytes;
            let Some(delim) = rest[delim_at..].chars().next() else {
                return self.need_more();
            };
            elements.push(value.to_string());
            pos += delim_at + delim.len_utf8();
            match delim {
                ',' => {}
                ';' => break pos,
                found => return Err(ProtocolError::BadDelimiter { found }),
            }
        };

        self.buffer.drain(..consumed);
        let mut iter = elements.into_iter();
        let opcode = iter.next().expect("a terminated frame has an opcode");
        Ok(Some(Frame {
            opcode,
            args: iter.collect(),
        }))
    }

    fn need_more(&self) -> Result<Option<Frame>, ProtocolError> {
        if self.buffer.len() > MAX_FRAME_BYTES {
            return Err(ProtocolError::FrameTooLong);
        }
        Ok(None)
    }
}

// ── Typed decoding ────────────────────────────────────────────────────────────

/// Converts a loose [`Frame`] into a typed [`Instruction`], validating arity
/// and argument syntax.
pub fn decode_instruction(frame: &Frame) -> Result<Instruction, ProtocolError> {
    match frame.opcode.as_str() {
        "args" => Ok(Instruction::Args {
            names: frame.args.clone(),
        }),
        "size" => {
            expect_args(frame, 3)?;
            Ok(Instruction::Size {
                layer: parse_arg(frame, 0)?,
                width: parse_arg(frame, 1)?,
                height: parse_arg(frame, 2)?,
            })
        }
        "rect" => {
            expect_args(frame, 5)?;
            Ok(Instruction::Rect {
                layer: parse_arg(frame, 0)?,
                x: parse_arg(frame, 1)?,
                y: parse_arg(frame, 2)?,
                width: parse_arg(frame, 3)?,
                height: parse_arg(frame, 4)?,
            })
        }
        "cfill" => {
            expect_args(frame, 6)?;
            Ok(Instruction::Cfill {
                mode: parse_arg(frame, 0)?,
                layer: parse_arg(frame, 1)?,
                red: parse_arg(frame, 2)?,
                green: parse_arg(frame, 3)?,
                blue: parse_arg(frame, 4)?,
                alpha: parse_arg(frame, 5)?,
            })
        }
        "lfill" => {
            expect_args(frame, 3)?;
            Ok(Instruction::Lfill {
                mode: parse_arg(frame, 0)?,
                layer: parse_arg(frame, 1)?,
                source: parse_arg(frame, 2)?,
            })
        }
        "arc" => {
            expect_args(frame, 7)?;
            Ok(Instruction::Arc {
                layer: parse_arg(frame, 0)?,
                x: parse_arg(frame, 1)?,
                y: parse_arg(frame, 2)?,
                radius: parse_arg(frame, 3)?,
                start: parse_arg(frame, 4)?,
                end: parse_arg(frame, 5)?,
                negative: parse_flag(frame, 6)?,
            })
        }
        "close" => {
            expect_args(frame, 1)?;
            Ok(Instruction::Close {
                layer: parse_arg(frame, 0)?,
            })
        }
        "cstroke" => {
            expect_args(frame, 9)?;
            Ok(Instruction::Cstroke {
                mode: parse_arg(frame, 0)?,
                layer: parse_arg(frame, 1)?,
                cap: parse_arg(frame, 2)?,
                join: parse_arg(frame, 3)?,
                thickness: parse_arg(frame, 4)?,
                red: parse_arg(frame, 5)?,
                green: parse_arg(frame, 6)?,
                blue: parse_arg(frame, 7)?,
                alpha: parse_arg(frame, 8)?,
            })
        }
        "move" => {
            expect_args(frame, 5)?;
            Ok(Instruction::Move {
                layer: parse_arg(frame, 0)?,
                parent: parse_arg(frame, 1)?,
                x: parse_arg(frame, 2)?,
                y: parse_arg(frame, 3)?,
                z: parse_arg(frame, 4)?,
            })
        }
        "sync" => {
            expect_args(frame, 1)?;
            Ok(Instruction::Sync {
                timestamp: parse_arg(frame, 0)?,
            })
        }
        "ready" => {
            expect_args(frame, 1)?;
            Ok(Instruction::Ready {
                connection_id: frame.args[0].clone(),
            })
        }
        "disconnect" => {
            expect_args(frame, 0)?;
            Ok(Instruction::Disconnect)
        }
        other => Err(ProtocolError::UnknownOpcode(other.to_string())),
    }
}

fn expect_args(frame: &Frame, expected: usize) -> Result<(), ProtocolError> {
    if frame.args.len() != expected {
        return Err(ProtocolError::WrongArgumentCount {
            opcode: frame.opcode.clone(),
            expected,
            actual: frame.args.len(),
        });
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(frame: &Frame, index: usize) -> Result<T, ProtocolError> {
    frame.args[index]
        .parse()
        .map_err(|_| ProtocolError::MalformedArgument {
            opcode: frame.opcode.clone(),
            index,
            value: frame.args[index].clone(),
        })
}

fn parse_flag(frame: &Frame, index: usize) -> Result<bool, ProtocolError> {
    match frame.args[index].as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ProtocolError::MalformedArgument {
            opcode: frame.opcode.clone(),
            index,
            value: frame.args[index].clone(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_is_byte_exact() {
        let encoded = encode_frame("select", &["ball".to_string()]);
        assert_eq!(encoded, "6.select,4.ball;");
    }

    #[test]
    fn test_encode_frame_counts_characters_not_bytes() {
        // "café" is 4 characters but 5 bytes.
        let encoded = encode_frame("args", &["café".to_string()]);
        assert_eq!(encoded, "4.args,4.café;");
    }

    #[test]
    fn test_decoder_parses_single_frame() {
        let mut decoder = Decoder::new();
        decoder.feed(b"6.select,4.ball;");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.opcode, "select");
        assert_eq!(frame.args, vec!["ball"]);
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn test_decoder_parses_back_to_back_frames() {
        let mut decoder = Decoder::new();
        decoder.feed(b"4.sync,3.100;4.sync,3.200;");
        assert_eq!(
            decoder.next_frame().unwrap().unwrap(),
            Frame::new("sync", vec!["100".to_string()])
        );
        assert_eq!(
            decoder.next_frame().unwrap().unwrap(),
            Frame::new("sync", vec!["200".to_string()])
        );
        assert_eq!(decoder.next_frame().unwrap(), None);
    }

    #[test]
    fn test_decoder_handles_split_feeds() {
        let mut decoder = Decoder::new();
        decoder.feed(b"4.si");
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.feed(b"ze,1.0,4.10");
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.feed(b"24,3.768;");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.opcode, "size");
        assert_eq!(frame.args, vec!["0", "1024", "768"]);
    }

    #[test]
    fn test_decoder_handles_split_inside_multibyte_character() {
        let encoded = encode_frame("args", &["café".to_string()]);
        let bytes = encoded.as_bytes();
        // Split in the middle of the two-byte 'é'.
        let split = bytes.len() - 3;

        let mut decoder = Decoder::new();
        decoder.feed(&bytes[..split]);
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.feed(&bytes[split..]);
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.args, vec!["café"]);
    }

    #[test]
    fn test_decoder_handles_empty_elements() {
        let mut decoder = Decoder::new();
        decoder.feed(b"4.args,0.;");
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.args, vec![""]);
    }

    #[test]
    fn test_decoder_rejects_missing_length_prefix() {
        let mut decoder = Decoder::new();
        decoder.feed(b"x.select;");
        assert_eq!(
            decoder.next_frame(),
            Err(ProtocolError::MalformedLength { found: 'x' })
        );
    }

    #[test]
    fn test_decoder_rejects_length_value_mismatch() {
        // Length says 3 but the value has 4 characters before the delimiter,
        // so the parser lands on 'l' where a delimiter should be.
        let mut decoder = Decoder::new();
        decoder.feed(b"3.ball;");
        assert_eq!(
            decoder.next_frame(),
            Err(ProtocolError::BadDelimiter { found: 'l' })
        );
    }

    #[test]
    fn test_decoder_rejects_oversized_element() {
        let mut decoder = Decoder::new();
        decoder.feed(b"9000.x;");
        assert_eq!(decoder.next_frame(), Err(ProtocolError::FrameTooLong));
    }

    #[test]
    fn test_decode_instruction_rejects_unknown_opcode() {
        let frame = Frame::new("mouse", vec!["1".to_string()]);
        assert_eq!(
            decode_instruction(&frame),
            Err(ProtocolError::UnknownOpcode("mouse".to_string()))
        );
    }

    #[test]
    fn test_decode_instruction_rejects_wrong_arity() {
        let frame = Frame::new("size", vec!["0".to_string()]);
        assert!(matches!(
            decode_instruction(&frame),
            Err(ProtocolError::WrongArgumentCount {
                expected: 3,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_instruction_rejects_non_numeric_argument() {
        let frame = Frame::new(
            "sync",
            vec!["soon".to_string()],
        );
        assert!(matches!(
            decode_instruction(&frame),
            Err(ProtocolError::MalformedArgument { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_instruction_rejects_bad_winding_flag() {
        let frame = Frame::new(
            "arc",
            vec!["1", "64", "64", "62", "0", "6.28", "2"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        assert!(matches!(
            decode_instruction(&frame),
            Err(ProtocolError::MalformedArgument { index: 6, .. })
        ));
    }
}
