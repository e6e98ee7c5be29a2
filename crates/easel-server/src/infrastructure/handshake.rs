//! Protocol handshake for a joining viewer.
//!
//! The exchange mirrors the standard instruction-stream negotiation:
//!
//! ```text
//! Viewer                              Server
//! ──────                              ──────
//! select <protocol | connection-id>
//!                                     args <version>
//! size/audio/video/image/timezone*   (optional declarations, recorded
//!                                      or skipped)
//! connect
//!                                     ready <connection-id>
//! ```
//!
//! `select` is the only instruction the server is strict about: it must
//! arrive first, carry exactly one argument, and name either the advertised
//! protocol or this session's connection ID (the join-existing case).
//! Declarations before `connect` are optional and unknown ones are skipped,
//! so newer viewers can talk to this server.

use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info};
use uuid::Uuid;

use easel_core::{Frame, Instruction, PROTOCOL_VERSION};

use super::transport::{FrameReader, InstructionSink, TransportError};

/// Errors that can end a handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The viewer went silent before completing the phase.
    #[error("handshake timed out waiting for {phase}")]
    TimedOut { phase: &'static str },

    /// The viewer closed the connection mid-handshake.
    #[error("viewer closed the connection during handshake")]
    ConnectionClosed,

    /// The first instruction was not `select`.
    #[error("expected \"select\", viewer sent {actual:?}")]
    UnexpectedOpcode { actual: String },

    /// `select` did not carry exactly one argument.
    #[error("\"select\" carried {0} arguments, expected exactly one")]
    BadSelect(usize),

    /// The selected name matches neither the protocol nor the connection ID.
    #[error("unknown protocol or connection id: {0:?}")]
    InvalidIdentifier(String),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What this server advertises during the handshake.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    /// Name a fresh viewer selects to start the application.
    pub protocol_name: String,
    /// ID an already-established session can be joined under.
    pub connection_id: String,
}

impl ServerIdentity {
    /// Creates an identity with a fresh `$`-prefixed connection ID.
    pub fn new(protocol_name: impl Into<String>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            connection_id: format!("${}", Uuid::new_v4()),
        }
    }
}

/// What the viewer declared before `connect`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerInfo {
    /// `true` when the viewer selected the connection ID rather than the
    /// protocol name.
    pub joined_existing: bool,
    /// Optimal display size, when declared.
    pub optimal_size: Option<(i32, i32)>,
    /// Optimal display resolution in DPI, when declared.
    pub optimal_dpi: Option<i32>,
}

/// Runs the server side of the handshake on a fresh connection.
pub async fn negotiate<R, S>(
    reader: &mut FrameReader<R>,
    sink: &mut S,
    identity: &ServerIdentity,
    timeout: Duration,
) -> Result<ViewerInfo, HandshakeError>
where
    R: AsyncRead + Unpin,
    S: InstructionSink + ?Sized,
{
    let select = expect_frame(reader, timeout, "select").await?;
    if select.opcode != "select" {
        return Err(HandshakeError::UnexpectedOpcode {
            actual: select.opcode,
        });
    }
    if select.args.len() != 1 {
        return Err(HandshakeError::BadSelect(select.args.len()));
    }

    let identifier = &select.args[0];
    let mut info = ViewerInfo::default();
    if *identifier == identity.protocol_name {
        info!("viewer selected {:?}", identity.protocol_name);
    } else if *identifier == identity.connection_id {
        info!("viewer is joining the existing connection");
        info.joined_existing = true;
    } else {
        return Err(HandshakeError::InvalidIdentifier(identifier.clone()));
    }

    // Advertise the protocol version; this application declares no
    // connection arguments of its own.
    sink.send(&Instruction::Args {
        names: vec![PROTOCOL_VERSION.to_string()],
    })
    .await?;
    sink.flush().await?;

    // Consume optional declarations until the viewer commits.
    loop {
        let frame = expect_frame(reader, timeout, "connect").await?;
        match frame.opcode.as_str() {
            "connect" => break,
            "size" => {
                info.optimal_size = parse_size(&frame);
                info.optimal_dpi = frame.args.get(2).and_then(|a| a.parse().ok());
            }
            "audio" | "video" | "image" | "timezone" => {
                debug!("viewer declared {}: {:?}", frame.opcode, frame.args);
            }
            other => debug!("skipping unknown handshake instruction {other:?}"),
        }
    }

    sink.send(&Instruction::Ready {
        connection_id: identity.connection_id.clone(),
    })
    .await?;
    sink.flush().await?;

    info!("handshake complete, connection {}", identity.connection_id);
    Ok(info)
}

async fn expect_frame<R>(
    reader: &mut FrameReader<R>,
    timeout: Duration,
    phase: &'static str,
) -> Result<Frame, HandshakeError>
where
    R: AsyncRead + Unpin,
{
    match tokio::time::timeout(timeout, reader.next_frame()).await {
        Err(_) => Err(HandshakeError::TimedOut { phase }),
        Ok(Ok(None)) => Err(HandshakeError::ConnectionClosed),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(Some(frame))) => Ok(frame),
    }
}

fn parse_size(frame: &Frame) -> Option<(i32, i32)> {
    let width = frame.args.first()?.parse().ok()?;
    let height = frame.args.get(1)?.parse().ok()?;
    Some((width, height))
}
