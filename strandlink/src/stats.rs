//! Counters kept by the protocol engine.

/// Link-level statistics for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// DATA frames transmitted, including retransmissions.
    pub data_sent: u64,
    /// Standalone ACK frames transmitted.
    pub acks_sent: u64,
    /// NAK frames transmitted.
    pub naks_sent: u64,
    /// DATA frames resent after their retransmission timer expired.
    pub retransmissions: u64,
    /// DATA frames resent in response to a NAK.
    pub fast_retransmits: u64,
    /// Undamaged frames received, of any kind.
    pub frames_received: u64,
    /// Frames that failed their checksum.
    pub corrupt_frames: u64,
    /// Packets handed to the network layer.
    pub packets_delivered: u64,
    /// DATA frames dropped as duplicates or outside the receive window.
    pub duplicates_dropped: u64,
    /// Retransmission timeouts for frames no longer outstanding.
    pub stale_timeouts: u64,
    /// Upstream-ready events ignored because the window was full or the
    /// network layer had nothing to send.
    pub ignored_ready: u64,
    /// Packets pulled from upstream and discarded because they exceed
    /// [`MAX_PAYLOAD`](crate::MAX_PAYLOAD).
    pub oversized_dropped: u64,
}

impl LinkStats {
    /// Total frames transmitted.
    pub fn frames_sent(&self) -> u64 {
        self.data_sent + self.acks_sent + self.naks_sent
    }
}
