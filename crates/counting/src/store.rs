//! Persistence trait for the counter table.

use async_trait::async_trait;

use crate::{
    Result,
    state::{ChannelKey, ChannelState},
};

/// Result of starting tracking for a channel. Already-tracked is a
/// user-facing no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyTracked,
}

/// Result of stopping tracking for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotTracked,
}

/// Mutation applied to a channel's state under the store's lock.
pub type Mutation = Box<dyn FnOnce(&mut ChannelState) + Send>;

/// Durable storage for counter state.
///
/// Every mutating method persists synchronously before returning; callers
/// never batch. The whole table is serialized on each persist.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read the persisted table into memory. Called once at startup; a
    /// missing file initializes an empty table and persists it, a malformed
    /// file is a fatal error.
    async fn load(&self) -> Result<()>;

    /// Current state for a channel, or `None` if untracked. No side effects.
    async fn get(&self, key: &ChannelKey) -> Result<Option<ChannelState>>;

    /// Begin tracking a channel with `{count: 0, record: 0, last_user: None}`.
    async fn start(&self, key: &ChannelKey) -> Result<StartOutcome>;

    /// Stop tracking a channel, removing its state entirely.
    async fn stop(&self, key: &ChannelKey) -> Result<StopOutcome>;

    /// Apply a transition to an existing entry and persist the result.
    /// Fails with [`crate::Error::NotTracked`] if the channel has no entry.
    async fn apply(&self, key: &ChannelKey, mutation: Mutation) -> Result<ChannelState>;
}
