//! The sliding-window protocol engine.
//!
//! A single-threaded, event-driven state machine. Events are consumed one at
//! a time, so window state needs no locking: timers and the channel only
//! ever post [`Event`]s.
//!
//! The receiver buffers out-of-order frames inside its window (selective
//! repeat), while the sender retransmits one frame per expired timer. A NAK
//! triggers an immediate retransmission of the single frame it names.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::event::Event;
use crate::frame::{length_field, Frame, FrameKind, Packet};
use crate::layer::{NetworkLayer, PhysicalLayer};
use crate::seq::{Seq, SeqSpace};
use crate::stats::LinkStats;
use crate::timer::TimerService;
use crate::window::{ReceiverWindow, SenderWindow};

/// Protocol engine for one end of a link.
pub struct Engine<N, P, T: TimerService> {
    config: LinkConfig,
    space: SeqSpace,
    sender: SenderWindow,
    receiver: ReceiverWindow,
    /// Cleared after a NAK goes out, set again once an in-order frame is
    /// delivered. At most one NAK per gap.
    nak_allowed: bool,
    /// One retransmission timer per sender slot.
    retransmit_timers: Vec<Option<T::Handle>>,
    ack_timer: Option<T::Handle>,
    network: N,
    physical: P,
    timers: T,
    stats: LinkStats,
}

impl<N, P, T> Engine<N, P, T>
where
    N: NetworkLayer,
    P: PhysicalLayer,
    T: TimerService,
{
    /// Create an engine after validating `config`.
    pub fn new(config: LinkConfig, network: N, physical: P, timers: T) -> Result<Self> {
        config.validate()?;
        let space = config.seq_space();
        let nr_bufs = space.nr_bufs();
        Ok(Self {
            config,
            space,
            sender: SenderWindow::new(space),
            receiver: ReceiverWindow::new(space),
            nak_allowed: true,
            retransmit_timers: (0..nr_bufs).map(|_| None).collect(),
            ack_timer: None,
            network,
            physical,
            timers,
            stats: LinkStats::default(),
        })
    }

    /// Open the sender window: grant the network layer `NR_BUFS` credits.
    pub fn start(&mut self) {
        debug!(nr_bufs = self.space.nr_bufs(), "link engine starting");
        self.network.grant_credit(self.space.nr_bufs());
    }

    /// Process a single event.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::UpstreamReady => self.on_upstream_ready(),
            Event::FrameArrived(frame) => self.on_frame_arrival(frame),
            Event::CorruptFrame => self.on_corrupt_frame(),
            Event::RetransmitTimeout(seq) => self.on_retransmit_timeout(seq),
            Event::AckTimeout => self.on_ack_timeout(),
        }
    }

    /// Start the engine and process events until every producer is gone.
    pub async fn run(self, events: mpsc::UnboundedReceiver<Event>) -> Self {
        self.run_until(events, std::future::pending::<()>()).await
    }

    /// Start the engine and process events until `shutdown` completes or
    /// every producer is gone. Returns the engine for inspection.
    pub async fn run_until<F>(mut self, mut events: mpsc::UnboundedReceiver<Event>, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        self.start();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("link engine shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        debug!("event stream closed");
                        break;
                    }
                },
            }
        }
        self.stop_all_timers();
        self
    }

    fn on_upstream_ready(&mut self) {
        if self.sender.is_full() {
            warn!(
                outstanding = self.sender.outstanding(),
                "upstream ready while send window is full"
            );
            self.stats.ignored_ready += 1;
            return;
        }
        let Some(packet) = self.network.pull() else {
            warn!("upstream ready but no packet to pull");
            self.stats.ignored_ready += 1;
            return;
        };
        if let Err(err) = length_field(packet.len()) {
            warn!(error = %err, "oversized packet dropped");
            self.stats.oversized_dropped += 1;
            // The slot was never used, so the credit goes back.
            self.network.grant_credit(1);
            return;
        }
        if let Some(seq) = self.sender.push(packet) {
            self.send_frame(FrameKind::Data, seq);
        }
    }

    fn on_frame_arrival(&mut self, frame: Frame) {
        if !self.space.contains(frame.seq) || !self.space.contains(frame.ack) {
            warn!(seq = frame.seq, ack = frame.ack, "frame outside sequence space");
            self.on_corrupt_frame();
            return;
        }
        self.stats.frames_received += 1;
        trace!(kind = ?frame.kind, seq = frame.seq, ack = frame.ack, "frame arrived");

        if frame.kind == FrameKind::Data {
            self.on_data(frame.seq, frame.info);
        }

        if frame.kind == FrameKind::Nak {
            let wanted = self.space.inc(frame.ack);
            if self.sender.is_outstanding(wanted) {
                debug!(seq = wanted, "nak received, fast retransmit");
                self.stats.fast_retransmits += 1;
                self.send_frame(FrameKind::Data, wanted);
            }
        }

        // Cumulative ack, piggybacked on every kind.
        while self.sender.is_outstanding(frame.ack) {
            let oldest = self.sender.ack_expected();
            self.stop_timer(oldest);
            self.sender.acknowledge_oldest();
            trace!(seq = oldest, "frame acknowledged");
            self.network.grant_credit(1);
        }
    }

    fn on_data(&mut self, seq: Seq, info: Option<Packet>) {
        let expected = self.receiver.frame_expected();
        if seq != expected && self.nak_allowed {
            self.send_frame(FrameKind::Nak, 0);
        } else {
            self.start_ack_timer();
        }

        let Some(packet) = info else {
            warn!(seq, "data frame without payload");
            return;
        };
        if !self.receiver.accept(seq, packet) {
            debug!(seq, frame_expected = expected, "duplicate or out-of-window frame dropped");
            self.stats.duplicates_dropped += 1;
            return;
        }

        while let Some(packet) = self.receiver.pop_in_order() {
            trace!(len = packet.len(), "delivering packet");
            self.network.deliver(packet);
            self.stats.packets_delivered += 1;
            self.nak_allowed = true;
            self.start_ack_timer();
        }
    }

    fn on_corrupt_frame(&mut self) {
        self.stats.corrupt_frames += 1;
        if self.nak_allowed {
            self.send_frame(FrameKind::Nak, 0);
        }
    }

    fn on_retransmit_timeout(&mut self, seq: Seq) {
        if !self.sender.is_outstanding(seq) {
            debug!(seq, "stale retransmit timeout ignored");
            self.stats.stale_timeouts += 1;
            return;
        }
        debug!(seq, "retransmit timeout");
        self.stats.retransmissions += 1;
        self.send_frame(FrameKind::Data, seq);
    }

    fn on_ack_timeout(&mut self) {
        // May be a late firing of a timer already replaced by a newer one.
        self.stop_ack_timer();
        self.send_frame(FrameKind::Ack, 0);
    }

    /// Assemble and transmit a frame.
    ///
    /// DATA frames copy the retained payload and (re)arm the slot's
    /// retransmission timer. Every frame piggybacks the cumulative ack, so
    /// any pending ack-delay timer is cancelled afterwards.
    fn send_frame(&mut self, kind: FrameKind, frame_nr: Seq) {
        let ack = self.space.prev(self.receiver.frame_expected());
        let frame = match kind {
            FrameKind::Data => {
                let Some(info) = self.sender.get(frame_nr).cloned() else {
                    warn!(seq = frame_nr, "no retained payload for frame");
                    return;
                };
                self.start_timer(frame_nr);
                self.stats.data_sent += 1;
                Frame::data(frame_nr, ack, info)
            }
            FrameKind::Ack => {
                self.stats.acks_sent += 1;
                Frame::ack(ack)
            }
            FrameKind::Nak => {
                self.nak_allowed = false;
                self.stats.naks_sent += 1;
                Frame::nak(ack)
            }
        };

        debug!(
            kind = ?frame.kind,
            seq = frame.seq,
            ack = frame.ack,
            len = frame.payload_len(),
            "sending frame"
        );
        self.physical.transmit(frame);
        self.stop_ack_timer();
    }

    fn start_timer(&mut self, seq: Seq) {
        self.stop_timer(seq);
        let handle = self
            .timers
            .schedule(self.config.retransmit_timeout, Event::RetransmitTimeout(seq));
        self.retransmit_timers[self.space.slot(seq)] = Some(handle);
    }

    fn stop_timer(&mut self, seq: Seq) {
        if let Some(handle) = self.retransmit_timers[self.space.slot(seq)].take() {
            self.timers.cancel(handle);
        }
    }

    fn start_ack_timer(&mut self) {
        self.stop_ack_timer();
        self.ack_timer = Some(self.timers.schedule(self.config.ack_timeout, Event::AckTimeout));
    }

    fn stop_ack_timer(&mut self) {
        if let Some(handle) = self.ack_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn stop_all_timers(&mut self) {
        for slot in 0..self.retransmit_timers.len() {
            if let Some(handle) = self.retransmit_timers[slot].take() {
                self.timers.cancel(handle);
            }
        }
        self.stop_ack_timer();
    }
}

impl<N, P, T: TimerService> Engine<N, P, T> {
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Lower edge of the send window.
    pub fn ack_expected(&self) -> Seq {
        self.sender.ack_expected()
    }

    /// Upper edge (exclusive) of the send window.
    pub fn next_frame_to_send(&self) -> Seq {
        self.sender.next_frame_to_send()
    }

    /// Lower edge of the receive window.
    pub fn frame_expected(&self) -> Seq {
        self.receiver.frame_expected()
    }

    /// Upper edge (exclusive) of the receive window.
    pub fn too_far(&self) -> Seq {
        self.receiver.too_far()
    }

    /// Frames sent and not yet acknowledged.
    pub fn outstanding(&self) -> usize {
        self.sender.outstanding()
    }

    pub fn nak_allowed(&self) -> bool {
        self.nak_allowed
    }

    pub fn sender(&self) -> &SenderWindow {
        &self.sender
    }

    pub fn receiver(&self) -> &ReceiverWindow {
        &self.receiver
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn physical(&self) -> &P {
        &self.physical
    }

    pub fn physical_mut(&mut self) -> &mut P {
        &mut self.physical
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }
}
