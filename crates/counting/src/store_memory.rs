//! In-memory store for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    Error, Result,
    state::{ChannelKey, ChannelState, CounterTable},
    store::{CounterStore, Mutation, StartOutcome, StopOutcome},
};

/// In-memory store backed by `HashMap`. No persistence — for tests only.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<CounterTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel with a specific state, bypassing `start`.
    pub fn seed(&self, key: &ChannelKey, state: ChannelState) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table
            .entry(key.guild_id.clone())
            .or_default()
            .insert(key.channel_id.clone(), state);
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &ChannelKey) -> Result<Option<ChannelState>> {
        let table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        Ok(table
            .get(&key.guild_id)
            .and_then(|channels| channels.get(&key.channel_id))
            .cloned())
    }

    async fn start(&self, key: &ChannelKey) -> Result<StartOutcome> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let channels = table.entry(key.guild_id.clone()).or_default();
        if channels.contains_key(&key.channel_id) {
            return Ok(StartOutcome::AlreadyTracked);
        }
        channels.insert(key.channel_id.clone(), ChannelState::default());
        Ok(StartOutcome::Started)
    }

    async fn stop(&self, key: &ChannelKey) -> Result<StopOutcome> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let removed = table
            .get_mut(&key.guild_id)
            .and_then(|channels| channels.remove(&key.channel_id));
        Ok(if removed.is_some() {
            StopOutcome::Stopped
        } else {
            StopOutcome::NotTracked
        })
    }

    async fn apply(&self, key: &ChannelKey, mutation: Mutation) -> Result<ChannelState> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let state = table
            .get_mut(&key.guild_id)
            .and_then(|channels| channels.get_mut(&key.channel_id))
            .ok_or_else(|| Error::not_tracked(key))?;
        mutation(state);
        Ok(state.clone())
    }
}
