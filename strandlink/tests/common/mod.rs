//! Shared test doubles and a deterministic two-station harness.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use strandlink::{Engine, Event, Frame, LinkConfig, ManualTimers, NetworkLayer, Packet};

/// Network layer that records credit and deliveries.
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    pub credit: usize,
    pub outbox: VecDeque<Packet>,
    pub delivered: Vec<Packet>,
    pub pulls: usize,
}

impl NetworkLayer for RecordingNetwork {
    fn grant_credit(&mut self, n: usize) {
        self.credit += n;
    }

    fn pull(&mut self) -> Option<Packet> {
        self.pulls += 1;
        self.outbox.pop_front()
    }

    fn deliver(&mut self, packet: Packet) {
        self.delivered.push(packet);
    }
}

pub type TestEngine = Engine<RecordingNetwork, Vec<Frame>, ManualTimers>;

pub fn engine() -> TestEngine {
    engine_with(LinkConfig::default())
}

pub fn engine_with(config: LinkConfig) -> TestEngine {
    let mut engine = Engine::new(
        config,
        RecordingNetwork::default(),
        Vec::new(),
        ManualTimers::new(),
    )
    .unwrap();
    engine.start();
    engine
}

pub fn pkt(n: usize) -> Packet {
    Bytes::from(format!("packet-{n}"))
}

/// Queue `packets` upstream of `engine`.
pub fn queue(engine: &mut TestEngine, packets: impl IntoIterator<Item = Packet>) {
    engine.network_mut().outbox.extend(packets);
}

/// Issue one ready event per unit of credit that meets a queued packet,
/// the way a well-behaved network layer would.
pub fn pump_upstream(engine: &mut TestEngine) {
    while engine.network().credit > 0 && !engine.network().outbox.is_empty() {
        engine.network_mut().credit -= 1;
        engine.handle(Event::UpstreamReady);
    }
}

/// Take every frame transmitted since the last call.
pub fn take_frames(engine: &mut TestEngine) -> Vec<Frame> {
    std::mem::take(engine.physical_mut())
}

/// Feed frames into `engine` as arrivals.
pub fn arrive(engine: &mut TestEngine, frames: impl IntoIterator<Item = Frame>) {
    for frame in frames {
        engine.handle(Event::FrameArrived(frame));
    }
}

/// Advance the engine's virtual clock and handle whatever fires.
pub fn advance(engine: &mut TestEngine, by: Duration) {
    for event in engine.timers_mut().advance(by) {
        engine.handle(event);
    }
}

pub fn delivered(engine: &TestEngine) -> &[Packet] {
    &engine.network().delivered
}

/// Window invariants that must hold between any two events.
pub fn assert_invariants(engine: &TestEngine) {
    let space = engine.config().seq_space();
    let nr_bufs = space.nr_bufs();
    assert!(engine.outstanding() <= nr_bufs, "sender window overflow");
    assert_eq!(
        space.distance(engine.frame_expected(), engine.too_far()),
        nr_bufs,
        "receiver window span changed"
    );
}

/// What happens to a frame in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Deliver,
    Drop,
    Corrupt,
}

/// Two engines on a shared virtual clock, connected by a channel whose
/// impairments are chosen per frame by `fate`.
pub struct Pair {
    pub a: TestEngine,
    pub b: TestEngine,
}

impl Pair {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            a: engine_with(config.clone()),
            b: engine_with(config),
        }
    }

    /// Run until A has delivered `expect_a` packets, B has delivered
    /// `expect_b`, and neither side has frames outstanding, or until
    /// `max_steps` clock advances pass. Returns the number of steps taken.
    pub fn run(
        &mut self,
        expect_a: usize,
        expect_b: usize,
        max_steps: usize,
        mut fate: impl FnMut() -> Fate,
    ) -> usize {
        for step in 0..max_steps {
            loop {
                pump_upstream(&mut self.a);
                pump_upstream(&mut self.b);
                let from_a = take_frames(&mut self.a);
                let from_b = take_frames(&mut self.b);
                if from_a.is_empty() && from_b.is_empty() {
                    break;
                }
                for frame in from_a {
                    transfer(&mut self.b, frame, fate());
                    assert_invariants(&self.b);
                }
                for frame in from_b {
                    transfer(&mut self.a, frame, fate());
                    assert_invariants(&self.a);
                }
            }

            if delivered(&self.a).len() >= expect_a
                && delivered(&self.b).len() >= expect_b
                && self.a.outstanding() == 0
                && self.b.outstanding() == 0
            {
                return step;
            }

            let now = self.a.timers().now();
            let next = [self.a.timers().next_deadline(), self.b.timers().next_deadline()]
                .into_iter()
                .flatten()
                .min();
            let Some(next) = next else {
                return step;
            };
            let by = next.saturating_sub(now);
            advance(&mut self.a, by);
            advance(&mut self.b, by);
            assert_eq!(self.a.timers().now(), self.b.timers().now());
        }
        max_steps
    }
}

fn transfer(to: &mut TestEngine, frame: Frame, fate: Fate) {
    match fate {
        Fate::Deliver => to.handle(Event::FrameArrived(frame)),
        Fate::Drop => {}
        Fate::Corrupt => to.handle(Event::CorruptFrame),
    }
}
