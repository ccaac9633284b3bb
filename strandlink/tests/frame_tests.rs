//! Wire codec tests.

use bytes::Bytes;
use strandlink::frame::{Frame, FrameKind};
use strandlink::StrandLinkError;

#[test]
fn data_frame_roundtrip() {
    let frame = Frame::data(5, 3, Bytes::from_static(b"hello world"));
    let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
    assert_eq!(frame, decoded);
}

#[test]
fn data_frame_empty_payload() {
    let frame = Frame::data(0, 7, Bytes::new());
    let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
    assert_eq!(decoded.info, Some(Bytes::new()));
}

#[test]
fn control_frames_roundtrip() {
    for frame in [Frame::ack(6), Frame::nak(2)] {
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(frame, decoded);
        assert!(decoded.info.is_none());
    }
}

#[test]
fn wire_layout_is_big_endian() {
    let wire = Frame::data(1, 2, Bytes::from_static(b"xy")).encode().unwrap();
    assert_eq!(
        &wire[..15],
        &[0x00, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 2, b'x', b'y']
    );
    assert_eq!(wire.len(), 17);
}

#[test]
fn every_single_bit_flip_is_detected() {
    let wire = Frame::data(4, 1, Bytes::from_static(b"checksum")).encode().unwrap();
    for byte in 0..wire.len() {
        for bit in 0..8 {
            let mut damaged = wire.to_vec();
            damaged[byte] ^= 1 << bit;
            assert!(
                Frame::decode(&damaged).is_err(),
                "flip at byte {byte} bit {bit} went unnoticed"
            );
        }
    }
}

#[test]
fn checksum_mismatch_reported() {
    let mut wire = Frame::ack(1).encode().unwrap().to_vec();
    wire[5] ^= 0xff;
    assert!(matches!(
        Frame::decode(&wire),
        Err(StrandLinkError::ChecksumMismatch { .. })
    ));
}

#[test]
fn too_short_rejected() {
    let err = Frame::decode(&[0x00, 0x01]).unwrap_err();
    assert!(matches!(
        err,
        StrandLinkError::FrameTooShort {
            expected: 15,
            actual: 2
        }
    ));
}

/// Build a frame body by hand and append a valid checksum, so that decode
/// gets past the integrity check and exercises field validation.
fn with_valid_checksum(body: &[u8]) -> Vec<u8> {
    let mut sum: u32 = 0;
    for chunk in body.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum += u32::from(word);
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    let mut wire = body.to_vec();
    wire.extend_from_slice(&(!(sum as u16)).to_be_bytes());
    wire
}

#[test]
fn unknown_kind_rejected() {
    let body = [0x07, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        Frame::decode(&with_valid_checksum(&body)),
        Err(StrandLinkError::UnknownFrameKind(0x07))
    ));
}

#[test]
fn ack_with_payload_rejected() {
    let body = [0x01, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 1, 0xaa];
    assert!(matches!(
        Frame::decode(&with_valid_checksum(&body)),
        Err(StrandLinkError::UnexpectedPayload(FrameKind::Ack))
    ));
}

#[test]
fn length_field_must_match_payload() {
    let body = [0x00, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 9, b'a', b'b'];
    assert!(matches!(
        Frame::decode(&with_valid_checksum(&body)),
        Err(StrandLinkError::LengthMismatch {
            declared: 9,
            actual: 2
        })
    ));

    // Payload longer than declared.
    let body = [0x00, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, b'a', b'b', b'c'];
    assert!(matches!(
        Frame::decode(&with_valid_checksum(&body)),
        Err(StrandLinkError::LengthMismatch {
            declared: 1,
            actual: 3
        })
    ));
}

#[test]
fn frame_kind_from_u8() {
    assert_eq!(FrameKind::try_from(0).unwrap(), FrameKind::Data);
    assert_eq!(FrameKind::try_from(1).unwrap(), FrameKind::Ack);
    assert_eq!(FrameKind::try_from(2).unwrap(), FrameKind::Nak);
    assert!(FrameKind::try_from(3).is_err());
}
