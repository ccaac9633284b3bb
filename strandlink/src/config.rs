//! Link configuration: sequence space size and the two timer delays.

use std::time::Duration;

use crate::error::{Result, StrandLinkError};
use crate::seq::{Seq, SeqSpace, MAX_SEQ, MAX_SEQ_LIMIT};

/// Default retransmission delay: 50 ms.
const DEFAULT_RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(50);
/// Default ack delay: 20 ms. Must stay below the retransmission delay so a
/// pending ack goes out before the peer would retransmit.
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(20);

/// Configuration for a data link endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Upper bound of the cyclic sequence space.
    pub max_seq: Seq,
    /// Delay before an unacknowledged DATA frame is retransmitted.
    pub retransmit_timeout: Duration,
    /// Delay before an owed ack is sent as a standalone ACK frame.
    pub ack_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_seq: MAX_SEQ,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

impl LinkConfig {
    pub fn with_max_seq(mut self, max_seq: Seq) -> Self {
        self.max_seq = max_seq;
        self
    }

    pub fn with_retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Check the invariants the protocol relies on.
    ///
    /// `MAX_SEQ + 1` must be even so that `NR_BUFS` slots tile the sequence
    /// space exactly, and `MAX_SEQ` may not exceed [`MAX_SEQ_LIMIT`]. The ack
    /// delay must be strictly shorter than the retransmission delay.
    pub fn validate(&self) -> Result<()> {
        if self.max_seq == 0 || self.max_seq % 2 == 0 {
            return Err(StrandLinkError::InvalidMaxSeq(self.max_seq));
        }
        if self.max_seq > MAX_SEQ_LIMIT {
            return Err(StrandLinkError::SeqSpaceTooLarge {
                max_seq: self.max_seq,
                limit: MAX_SEQ_LIMIT,
            });
        }
        if self.retransmit_timeout.is_zero() {
            return Err(StrandLinkError::ZeroTimeout("retransmit"));
        }
        if self.ack_timeout.is_zero() {
            return Err(StrandLinkError::ZeroTimeout("ack"));
        }
        if self.ack_timeout >= self.retransmit_timeout {
            return Err(StrandLinkError::AckTimeoutTooLong {
                ack: self.ack_timeout,
                retransmit: self.retransmit_timeout,
            });
        }
        Ok(())
    }

    /// The sequence space described by `max_seq`.
    pub fn seq_space(&self) -> SeqSpace {
        SeqSpace::new(self.max_seq)
    }

    /// Window span (`NR_BUFS`).
    pub fn nr_bufs(&self) -> usize {
        self.seq_space().nr_bufs()
    }
}
