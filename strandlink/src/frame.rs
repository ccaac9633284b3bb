use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StrandLinkError};
use crate::seq::Seq;

/// A network-layer payload carried by a DATA frame.
pub type Packet = Bytes;

/// Header bytes preceding the payload: kind(1) + seq(4) + ack(4) + len(4).
const HEADER_LEN: usize = 13;
/// Trailing checksum bytes.
const CHECKSUM_LEN: usize = 2;
/// Largest payload the 32-bit length field can describe.
pub const MAX_PAYLOAD: usize = u32::MAX as usize;

/// Frame kinds exchanged between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    Data = 0x00,
    Ack = 0x01,
    Nak = 0x02,
}

impl TryFrom<u8> for FrameKind {
    type Error = StrandLinkError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(FrameKind::Data),
            0x01 => Ok(FrameKind::Ack),
            0x02 => Ok(FrameKind::Nak),
            other => Err(StrandLinkError::UnknownFrameKind(other)),
        }
    }
}

/// StrandLink wire frame.
///
/// Every frame piggybacks a cumulative `ack`: the peer has received all
/// frames up to and including that sequence number. `info` is present only
/// on DATA frames.
///
/// Binary layout (all fields big-endian):
///
/// ```text
/// +------+-------+-------+-------+---- len ----+----------+
/// | kind |  seq  |  ack  |  len  |   payload   | checksum |
/// | (1B) | (4B)  | (4B)  | (4B)  |             |   (2B)   |
/// +------+-------+-------+-------+-------------+----------+
/// ```
///
/// The checksum is the RFC 1071 Internet checksum of every byte before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub seq: Seq,
    pub ack: Seq,
    pub info: Option<Packet>,
}

impl Frame {
    /// A DATA frame carrying `info`.
    pub fn data(seq: Seq, ack: Seq, info: Packet) -> Self {
        Self {
            kind: FrameKind::Data,
            seq,
            ack,
            info: Some(info),
        }
    }

    /// A standalone ACK frame. The sequence field is unused.
    pub fn ack(ack: Seq) -> Self {
        Self {
            kind: FrameKind::Ack,
            seq: 0,
            ack,
            info: None,
        }
    }

    /// A NAK frame asking for the frame after `ack`. The sequence field is unused.
    pub fn nak(ack: Seq) -> Self {
        Self {
            kind: FrameKind::Nak,
            seq: 0,
            ack,
            info: None,
        }
    }

    /// Payload length in bytes (0 for ACK/NAK).
    pub fn payload_len(&self) -> usize {
        self.info.as_ref().map_or(0, Bytes::len)
    }

    /// The total number of bytes this frame occupies when encoded.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload_len() + CHECKSUM_LEN
    }

    /// Encode this frame into a byte buffer.
    ///
    /// Fails with [`StrandLinkError::PayloadTooLarge`] if the payload does
    /// not fit the length field.
    pub fn encode(&self) -> Result<Bytes> {
        length_field(self.payload_len())?;
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode into a pre-allocated `BytesMut`. Nothing is written on error.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let len = length_field(self.payload_len())?;
        let start = buf.len();
        buf.put_u8(self.kind as u8);
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        buf.put_u32(len);
        if let Some(info) = &self.info {
            buf.put_slice(info);
        }
        let checksum = internet_checksum(&buf[start..]);
        buf.put_u16(checksum);
        Ok(())
    }

    /// Decode a frame from the given byte buffer.
    ///
    /// The checksum is verified before any field is trusted.
    pub fn decode(data: &[u8]) -> Result<Self> {
        ensure_len(data, HEADER_LEN + CHECKSUM_LEN)?;

        let (body, mut trailer) = data.split_at(data.len() - CHECKSUM_LEN);
        let carried = trailer.get_u16();
        let computed = internet_checksum(body);
        if carried != computed {
            return Err(StrandLinkError::ChecksumMismatch { carried, computed });
        }

        let kind = FrameKind::try_from(body[0])?;
        let seq = (&body[1..5]).get_u32();
        let ack = (&body[5..9]).get_u32();
        let len = (&body[9..13]).get_u32() as usize;
        let payload = &body[HEADER_LEN..];
        if payload.len() != len {
            return Err(StrandLinkError::LengthMismatch {
                declared: len,
                actual: payload.len(),
            });
        }

        let info = match kind {
            FrameKind::Data => Some(Bytes::copy_from_slice(payload)),
            _ if len != 0 => return Err(StrandLinkError::UnexpectedPayload(kind)),
            _ => None,
        };

        Ok(Self {
            kind,
            seq,
            ack,
            info,
        })
    }
}

/// The wire value of the length field for a payload of `size` bytes.
pub(crate) fn length_field(size: usize) -> Result<u32> {
    u32::try_from(size).map_err(|_| StrandLinkError::PayloadTooLarge {
        size,
        max: MAX_PAYLOAD,
    })
}

fn ensure_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        Err(StrandLinkError::FrameTooShort {
            expected: needed,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Compute the Internet checksum (RFC 1071) over `data`.
///
/// Sums 16-bit big-endian words, folds the carries and returns the
/// one's complement. An odd trailing byte is padded with zero.
fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
