//! StrandLink -- Layer 2 sliding-window data link for the Strand Protocol stack.
//!
//! Provides in-order, duplicate-free delivery over a channel that may lose or
//! corrupt frames (but never reorders them):
//! - **Bounded windows** of `NR_BUFS = (MAX_SEQ + 1) / 2` frames each way
//! - **Piggybacked cumulative acks**, with a short ack-delay timer fallback
//! - **NAK-driven fast retransmit**, at most one NAK per gap
//! - **Per-frame retransmission timers**

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod frame;
pub mod layer;
pub mod seq;
pub mod sim;
pub mod stats;
pub mod timer;
pub mod window;

// Re-export key public types at crate root.
pub use config::LinkConfig;
pub use engine::Engine;
pub use error::{Result, StrandLinkError};
pub use event::Event;
pub use frame::{Frame, FrameKind, Packet, MAX_PAYLOAD};
pub use layer::{NetworkLayer, PhysicalLayer};
pub use seq::{between, Seq, SeqSpace, MAX_SEQ, MAX_SEQ_LIMIT};
pub use stats::LinkStats;
pub use timer::{ManualTimers, TimerService, TokioTimers};
