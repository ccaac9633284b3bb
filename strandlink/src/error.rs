use std::time::Duration;

use thiserror::Error;

use crate::frame::FrameKind;

/// All errors produced by the StrandLink data link layer.
///
/// The protocol engine itself never fails while handling events; these
/// errors come from configuration checks and from the wire codec.
#[derive(Debug, Error)]
pub enum StrandLinkError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("length field says {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unknown frame kind: 0x{0:02x}")]
    UnknownFrameKind(u8),

    #[error("checksum mismatch: frame carries 0x{carried:04x}, computed 0x{computed:04x}")]
    ChecksumMismatch { carried: u16, computed: u16 },

    #[error("{0:?} frame must not carry a payload")]
    UnexpectedPayload(FrameKind),

    #[error("invalid MAX_SEQ {0}: must be at least 1 with an even sequence space")]
    InvalidMaxSeq(u32),

    #[error("MAX_SEQ {max_seq} exceeds limit {limit}")]
    SeqSpaceTooLarge { max_seq: u32, limit: u32 },

    #[error("{0} timeout must be non-zero")]
    ZeroTimeout(&'static str),

    #[error("ack timeout {ack:?} must be shorter than retransmit timeout {retransmit:?}")]
    AckTimeoutTooLong { ack: Duration, retransmit: Duration },
}

pub type Result<T> = std::result::Result<T, StrandLinkError>;
