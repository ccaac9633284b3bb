//! Collaborator traits for the layers above and below the engine.

use crate::frame::{Frame, Packet};

/// The network layer above the link: source and sink of packets.
pub trait NetworkLayer {
    /// Allow the network layer to hand over `n` more packets.
    ///
    /// Each packet it then has ready should be announced with one
    /// [`Event::UpstreamReady`](crate::event::Event::UpstreamReady).
    fn grant_credit(&mut self, n: usize);

    /// Take the next packet to send, if any.
    fn pull(&mut self) -> Option<Packet>;

    /// Hand a packet upward. Called in strictly increasing sequence order,
    /// without gaps or duplicates.
    fn deliver(&mut self, packet: Packet);
}

/// The channel below the link.
pub trait PhysicalLayer {
    /// Put a frame on the wire.
    fn transmit(&mut self, frame: Frame);
}

/// Collects transmitted frames, mostly useful for inspection.
impl PhysicalLayer for Vec<Frame> {
    fn transmit(&mut self, frame: Frame) {
        self.push(frame);
    }
}
