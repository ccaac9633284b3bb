//! In-memory simulated link for tests, demos and benchmarks.
//!
//! Two stations are wired back to back. Each station's [`SimChannel`]
//! encodes outgoing frames and posts them straight into the peer's event
//! stream, optionally dropping or corrupting them on the way. The channel
//! never reorders or duplicates frames.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::config::LinkConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::event::Event;
use crate::frame::{Frame, Packet};
use crate::layer::{NetworkLayer, PhysicalLayer};
use crate::timer::TokioTimers;

/// What the channel does with one transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Deliver,
    Drop,
    Corrupt,
}

/// Impairments applied by a [`SimChannel`].
///
/// Scripted faults are consumed first, one per transmitted frame; after
/// that each frame is dropped with probability `loss_rate` or corrupted with
/// probability `corrupt_rate`.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    pub loss_rate: f64,
    pub corrupt_rate: f64,
    pub script: VecDeque<Fault>,
}

impl FaultConfig {
    /// A perfect channel.
    pub fn lossless() -> Self {
        Self::default()
    }

    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate;
        self
    }

    pub fn with_corrupt_rate(mut self, rate: f64) -> Self {
        self.corrupt_rate = rate;
        self
    }

    pub fn with_script(mut self, script: impl IntoIterator<Item = Fault>) -> Self {
        self.script = script.into_iter().collect();
        self
    }
}

/// Physical layer that feeds the peer's event stream directly.
pub struct SimChannel {
    peer: mpsc::UnboundedSender<Event>,
    faults: FaultConfig,
    sent: u64,
    dropped: u64,
    corrupted: u64,
}

impl SimChannel {
    pub fn new(peer: mpsc::UnboundedSender<Event>, faults: FaultConfig) -> Self {
        Self {
            peer,
            faults,
            sent: 0,
            dropped: 0,
            corrupted: 0,
        }
    }

    /// Frames handed to the channel.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Frames the channel lost.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Frames the channel damaged.
    pub fn corrupted(&self) -> u64 {
        self.corrupted
    }

    fn next_fault(&mut self) -> Fault {
        if let Some(fault) = self.faults.script.pop_front() {
            return fault;
        }
        let roll = rand::random::<f64>();
        if roll < self.faults.loss_rate {
            Fault::Drop
        } else if roll < self.faults.loss_rate + self.faults.corrupt_rate {
            Fault::Corrupt
        } else {
            Fault::Deliver
        }
    }
}

impl PhysicalLayer for SimChannel {
    fn transmit(&mut self, frame: Frame) {
        self.sent += 1;
        let wire = match frame.encode() {
            Ok(wire) => wire,
            Err(err) => {
                warn!(seq = frame.seq, error = %err, "frame cannot be encoded, not sent");
                self.dropped += 1;
                return;
            }
        };
        let event = match self.next_fault() {
            Fault::Deliver => Event::from_wire(&wire),
            Fault::Drop => {
                trace!(seq = frame.seq, kind = ?frame.kind, "channel dropped frame");
                self.dropped += 1;
                return;
            }
            Fault::Corrupt => {
                trace!(seq = frame.seq, kind = ?frame.kind, "channel corrupted frame");
                self.corrupted += 1;
                let mut damaged = wire.to_vec();
                // Any single flipped bit defeats the checksum.
                let at = (self.sent as usize) % damaged.len();
                damaged[at] ^= 0x01;
                Event::from_wire(&damaged)
            }
        };
        // A peer that has shut down simply stops listening.
        let _ = self.peer.send(event);
    }
}

/// Packets waiting for the link, plus the credit the engine has granted.
#[derive(Debug, Default)]
struct Outbox {
    queue: VecDeque<Packet>,
    credit: usize,
    /// Ready events posted but not yet answered by a pull.
    announced: usize,
}

impl Outbox {
    /// One ready event per unit of credit that meets an unannounced packet.
    fn announce(&mut self, events: &mpsc::UnboundedSender<Event>) {
        while self.credit > 0 && self.announced < self.queue.len() {
            self.credit -= 1;
            self.announced += 1;
            let _ = events.send(Event::UpstreamReady);
        }
    }
}

/// Network layer backed by a shared outbox and a delivery channel.
pub struct SimNetwork {
    outbox: Arc<Mutex<Outbox>>,
    events: mpsc::UnboundedSender<Event>,
    delivered: mpsc::UnboundedSender<Packet>,
}

impl NetworkLayer for SimNetwork {
    fn grant_credit(&mut self, n: usize) {
        let mut outbox = self.outbox.lock();
        outbox.credit += n;
        outbox.announce(&self.events);
    }

    fn pull(&mut self) -> Option<Packet> {
        let mut outbox = self.outbox.lock();
        let packet = outbox.queue.pop_front()?;
        outbox.announced = outbox.announced.saturating_sub(1);
        Some(packet)
    }

    fn deliver(&mut self, packet: Packet) {
        let _ = self.delivered.send(packet);
    }
}

/// Application-side handle for queueing packets on a station.
#[derive(Clone)]
pub struct StationHandle {
    outbox: Arc<Mutex<Outbox>>,
    events: mpsc::UnboundedSender<Event>,
}

impl StationHandle {
    /// Queue a packet for transmission.
    pub fn send(&self, packet: impl Into<Packet>) {
        let mut outbox = self.outbox.lock();
        outbox.queue.push_back(packet.into());
        outbox.announce(&self.events);
    }

    /// Packets queued and not yet pulled by the engine.
    pub fn queued(&self) -> usize {
        self.outbox.lock().queue.len()
    }
}

pub type SimEngine = Engine<SimNetwork, SimChannel, TokioTimers>;

/// One end of a simulated link.
pub struct Station {
    pub engine: SimEngine,
    pub events: mpsc::UnboundedReceiver<Event>,
    pub handle: StationHandle,
    pub delivered: mpsc::UnboundedReceiver<Packet>,
}

/// Build two stations connected to each other.
///
/// `a_faults` impairs frames travelling from A to B, `b_faults` those from
/// B to A. Run each station's engine with [`Engine::run`] or
/// [`Engine::run_until`] inside a tokio runtime.
pub fn duplex(
    config: LinkConfig,
    a_faults: FaultConfig,
    b_faults: FaultConfig,
) -> Result<(Station, Station)> {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    let a = station(config.clone(), a_tx.clone(), a_rx, b_tx.clone(), a_faults)?;
    let b = station(config, b_tx, b_rx, a_tx, b_faults)?;
    Ok((a, b))
}

fn station(
    config: LinkConfig,
    own_tx: mpsc::UnboundedSender<Event>,
    own_rx: mpsc::UnboundedReceiver<Event>,
    peer_tx: mpsc::UnboundedSender<Event>,
    faults: FaultConfig,
) -> Result<Station> {
    let outbox = Arc::new(Mutex::new(Outbox::default()));
    let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
    let network = SimNetwork {
        outbox: Arc::clone(&outbox),
        events: own_tx.clone(),
        delivered: delivered_tx,
    };
    let engine = Engine::new(
        config,
        network,
        SimChannel::new(peer_tx, faults),
        TokioTimers::new(own_tx.clone()),
    )?;
    Ok(Station {
        engine,
        events: own_rx,
        handle: StationHandle {
            outbox,
            events: own_tx,
        },
        delivered: delivered_rx,
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn outbox_announces_only_with_credit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut outbox = Outbox::default();
        outbox.queue.push_back(Bytes::from_static(b"a"));
        outbox.queue.push_back(Bytes::from_static(b"b"));
        outbox.announce(&tx);
        assert!(rx.try_recv().is_err());

        outbox.credit = 1;
        outbox.announce(&tx);
        assert_eq!(rx.try_recv().unwrap(), Event::UpstreamReady);
        assert!(rx.try_recv().is_err());
        assert_eq!(outbox.credit, 0);
        assert_eq!(outbox.announced, 1);
    }

    #[test]
    fn scripted_faults_come_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let faults = FaultConfig::lossless().with_script([Fault::Drop, Fault::Corrupt]);
        let mut channel = SimChannel::new(tx, faults);

        channel.transmit(Frame::ack(1));
        channel.transmit(Frame::ack(2));
        channel.transmit(Frame::ack(3));

        assert_eq!(rx.try_recv().unwrap(), Event::CorruptFrame);
        assert_eq!(rx.try_recv().unwrap(), Event::FrameArrived(Frame::ack(3)));
        assert_eq!(channel.dropped(), 1);
        assert_eq!(channel.corrupted(), 1);
        assert_eq!(channel.sent(), 3);
    }
}
