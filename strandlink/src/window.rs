//! Sender and receiver sliding windows.
//!
//! ```text
//!   sender:   [ack_expected, next_frame_to_send)   at most NR_BUFS wide
//!   receiver: [frame_expected, too_far)            exactly NR_BUFS wide
//! ```
//!
//! Buffers are indexed by `seq mod NR_BUFS`. A slot holds `Some` exactly
//! while its sequence number is inside the window (sender) or has arrived
//! ahead of delivery (receiver).

use crate::frame::Packet;
use crate::seq::{between, Seq, SeqSpace};

/// Outstanding, not yet acknowledged DATA frames.
#[derive(Debug, Clone)]
pub struct SenderWindow {
    space: SeqSpace,
    /// Oldest unacknowledged sequence number (lower edge).
    ack_expected: Seq,
    /// Sequence number of the next new frame (upper edge, exclusive).
    next_frame_to_send: Seq,
    out_buf: Vec<Option<Packet>>,
}

impl SenderWindow {
    pub fn new(space: SeqSpace) -> Self {
        Self {
            space,
            ack_expected: 0,
            next_frame_to_send: 0,
            out_buf: vec![None; space.nr_bufs()],
        }
    }

    pub fn ack_expected(&self) -> Seq {
        self.ack_expected
    }

    pub fn next_frame_to_send(&self) -> Seq {
        self.next_frame_to_send
    }

    /// Number of frames sent and not yet acknowledged.
    pub fn outstanding(&self) -> usize {
        self.space.distance(self.ack_expected, self.next_frame_to_send)
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding() == 0
    }

    pub fn is_full(&self) -> bool {
        self.outstanding() >= self.space.nr_bufs()
    }

    /// Whether `seq` is in `[ack_expected, next_frame_to_send)`.
    pub fn is_outstanding(&self, seq: Seq) -> bool {
        between(self.ack_expected, seq, self.next_frame_to_send)
    }

    /// Place `packet` in the slot for `next_frame_to_send` and advance the
    /// upper edge. Returns the sequence number assigned, or `None` (leaving
    /// the window untouched) when the window is already full.
    pub fn push(&mut self, packet: Packet) -> Option<Seq> {
        if self.is_full() {
            return None;
        }
        let seq = self.next_frame_to_send;
        self.out_buf[self.space.slot(seq)] = Some(packet);
        self.next_frame_to_send = self.space.inc(seq);
        Some(seq)
    }

    /// The retained copy of an outstanding frame's payload.
    pub fn get(&self, seq: Seq) -> Option<&Packet> {
        if !self.is_outstanding(seq) {
            return None;
        }
        self.out_buf[self.space.slot(seq)].as_ref()
    }

    /// Confirm the oldest outstanding frame and slide the lower edge by one.
    /// Returns the confirmed sequence number.
    pub fn acknowledge_oldest(&mut self) -> Option<Seq> {
        if self.is_empty() {
            return None;
        }
        let seq = self.ack_expected;
        self.out_buf[self.space.slot(seq)] = None;
        self.ack_expected = self.space.inc(seq);
        Some(seq)
    }
}

/// Reorder buffer for frames that arrive ahead of `frame_expected`.
#[derive(Debug, Clone)]
pub struct ReceiverWindow {
    space: SeqSpace,
    /// Next sequence number to deliver upward (lower edge).
    frame_expected: Seq,
    /// First sequence number beyond the window (upper edge, exclusive).
    too_far: Seq,
    /// `Some` doubles as the arrived flag.
    in_buf: Vec<Option<Packet>>,
}

impl ReceiverWindow {
    pub fn new(space: SeqSpace) -> Self {
        Self {
            space,
            frame_expected: 0,
            too_far: space.nr_bufs() as Seq,
            in_buf: vec![None; space.nr_bufs()],
        }
    }

    pub fn frame_expected(&self) -> Seq {
        self.frame_expected
    }

    pub fn too_far(&self) -> Seq {
        self.too_far
    }

    /// Whether `seq` lies in `[frame_expected, too_far)`.
    pub fn in_window(&self, seq: Seq) -> bool {
        between(self.frame_expected, seq, self.too_far)
    }

    pub fn has_arrived(&self, seq: Seq) -> bool {
        self.in_buf[self.space.slot(seq)].is_some()
    }

    /// Number of frames buffered ahead of delivery.
    pub fn buffered(&self) -> usize {
        self.in_buf.iter().filter(|slot| slot.is_some()).count()
    }

    /// Buffer `packet` for `seq`. Returns `false` if `seq` is outside the
    /// window or its slot is already filled (a duplicate).
    pub fn accept(&mut self, seq: Seq, packet: Packet) -> bool {
        if !self.in_window(seq) || self.has_arrived(seq) {
            return false;
        }
        self.in_buf[self.space.slot(seq)] = Some(packet);
        true
    }

    /// Take the packet at `frame_expected` if it has arrived, sliding both
    /// edges forward by one.
    pub fn pop_in_order(&mut self) -> Option<Packet> {
        let packet = self.in_buf[self.space.slot(self.frame_expected)].take()?;
        self.frame_expected = self.space.inc(self.frame_expected);
        self.too_far = self.space.inc(self.too_far);
        Some(packet)
    }
}
