//! Events consumed by the protocol engine.

use tracing::debug;

use crate::frame::Frame;
use crate::seq::Seq;

/// One unit of work for the engine.
///
/// Each variant has exactly one producer: the upstream network layer, the
/// channel, the per-frame retransmission timers or the ack-delay timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The network layer has a packet and credit to send it.
    UpstreamReady,
    /// An undamaged frame arrived from the channel.
    FrameArrived(Frame),
    /// A frame arrived but failed its checksum.
    CorruptFrame,
    /// The retransmission timer for `seq` expired.
    RetransmitTimeout(Seq),
    /// No outgoing frame carried the owed ack in time.
    AckTimeout,
}

impl Event {
    /// Classify raw bytes received from the channel.
    ///
    /// Anything that does not decode cleanly is reported as
    /// [`Event::CorruptFrame`]: none of its fields can be trusted.
    pub fn from_wire(data: &[u8]) -> Self {
        match Frame::decode(data) {
            Ok(frame) => Event::FrameArrived(frame),
            Err(e) => {
                debug!(error = %e, len = data.len(), "undecodable frame");
                Event::CorruptFrame
            }
        }
    }
}
