//! Cyclic sequence-number arithmetic.
//!
//! Sequence numbers live in `[0, MAX_SEQ]` and wrap modulo `MAX_SEQ + 1`.
//! Both windows hold `NR_BUFS = (MAX_SEQ + 1) / 2` slots so that the sender
//! and receiver windows can never alias one another.

/// A sequence number in `[0, MAX_SEQ]`.
pub type Seq = u32;

/// Default upper bound of the sequence space.
pub const MAX_SEQ: Seq = 7;

/// Largest `MAX_SEQ` a [`LinkConfig`](crate::LinkConfig) accepts. Both
/// windows allocate `NR_BUFS` slots up front.
pub const MAX_SEQ_LIMIT: Seq = u16::MAX as Seq;

/// Returns `true` iff `b` lies in the cyclic interval `[a, c)`.
///
/// The interval starts at `a` and runs forward (wrapping past `MAX_SEQ`)
/// up to but excluding `c`. An interval with `a == c` is empty.
#[inline]
pub fn between(a: Seq, b: Seq, c: Seq) -> bool {
    (a <= b && b < c) || (c < a && a <= b) || (b < c && c < a)
}

/// The sequence space for a given `MAX_SEQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    max_seq: Seq,
}

impl SeqSpace {
    /// Create a sequence space with upper bound `max_seq`.
    ///
    /// The caller is responsible for `max_seq` being valid; see
    /// [`LinkConfig::validate`](crate::config::LinkConfig::validate).
    pub const fn new(max_seq: Seq) -> Self {
        Self { max_seq }
    }

    pub fn max_seq(&self) -> Seq {
        self.max_seq
    }

    /// Number of distinct sequence numbers (`MAX_SEQ + 1`).
    pub fn modulus(&self) -> u64 {
        u64::from(self.max_seq) + 1
    }

    /// Window span shared by sender and receiver (`NR_BUFS`).
    pub fn nr_bufs(&self) -> usize {
        (self.modulus() / 2) as usize
    }

    /// `(s + 1) mod (MAX_SEQ + 1)`.
    #[inline]
    pub fn inc(&self, s: Seq) -> Seq {
        ((u64::from(s) + 1) % self.modulus()) as Seq
    }

    /// The sequence number immediately preceding `s`.
    ///
    /// Used for the piggybacked cumulative ack: everything up to and
    /// including `prev(frame_expected)` has been received.
    #[inline]
    pub fn prev(&self, s: Seq) -> Seq {
        ((u64::from(s) + u64::from(self.max_seq)) % self.modulus()) as Seq
    }

    /// Forward distance from `from` to `to`.
    pub fn distance(&self, from: Seq, to: Seq) -> usize {
        ((u64::from(to) + self.modulus() - u64::from(from)) % self.modulus()) as usize
    }

    /// Buffer slot for `s` (`s mod NR_BUFS`).
    #[inline]
    pub fn slot(&self, s: Seq) -> usize {
        s as usize % self.nr_bufs()
    }

    /// Whether `s` is a legal sequence number in this space.
    pub fn contains(&self, s: Seq) -> bool {
        s <= self.max_seq
    }
}

impl Default for SeqSpace {
    fn default() -> Self {
        Self::new(MAX_SEQ)
    }
}
