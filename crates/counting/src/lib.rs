//! Counting-game state machine and persistence.
//!
//! Tracks one counter per channel: participants post consecutive integers,
//! no participant may count twice in a row, and the all-time record per
//! channel survives resets. The store owns the durable table; the engine
//! owns the transition rules and emits structured outcomes for the
//! presentation layer to render.

pub mod engine;
pub mod error;
pub mod milestones;
pub mod parse;
pub mod state;
pub mod store;
pub mod store_file;
pub mod store_memory;

pub use {
    engine::{Command, CommandReply, CountingEngine, DeletionNotice, FailureReason, MessageOutcome},
    error::{Error, Result},
    milestones::Milestones,
    state::{ChannelKey, ChannelState, CounterTable},
    store::{CounterStore, StartOutcome, StopOutcome},
};
