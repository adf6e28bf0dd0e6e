//! JSON file-backed counter store with atomic writes.

use std::path::PathBuf;

use {
    async_trait::async_trait,
    tokio::{fs, sync::Mutex},
    tracing::debug,
};

use crate::{
    Error, Result,
    state::{ChannelKey, ChannelState, CounterTable},
    store::{CounterStore, Mutation, StartOutcome, StopOutcome},
};

/// File-backed store: the whole table in a single JSON document, cached in
/// memory and rewritten wholesale on every mutation.
///
/// The cache sits behind a `tokio::sync::Mutex` held across the persist, so
/// each mutation and its durable write form one critical section: writes can
/// never land on disk out of order.
pub struct FileStore {
    path: PathBuf,
    table: Mutex<CounterTable>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            table: Mutex::new(CounterTable::new()),
        }
    }

    /// Create a store at the default `<data_dir>/counters.json` location.
    pub fn in_dir(data_dir: &std::path::Path) -> Self {
        Self::new(data_dir.join("counters.json"))
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn persist(&self, table: &CounterTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        // Backup existing file.
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for FileStore {
    async fn load(&self) -> Result<()> {
        let mut table = self.table.lock().await;
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "no counter file, initializing empty table");
            let empty = CounterTable::new();
            self.persist(&empty).await?;
            *table = empty;
            return Ok(());
        }
        let data = fs::read_to_string(&self.path).await?;
        // Malformed state is fatal: refusing to start beats silently
        // clobbering every channel's record.
        let parsed: CounterTable = serde_json::from_str(&data).map_err(|e| {
            Error::message(format!(
                "malformed counter file {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(path = %self.path.display(), guilds = parsed.len(), "loaded counter table");
        *table = parsed;
        Ok(())
    }

    async fn get(&self, key: &ChannelKey) -> Result<Option<ChannelState>> {
        let table = self.table.lock().await;
        Ok(table
            .get(&key.guild_id)
            .and_then(|channels| channels.get(&key.channel_id))
            .cloned())
    }

    async fn start(&self, key: &ChannelKey) -> Result<StartOutcome> {
        let mut table = self.table.lock().await;
        let channels = table.entry(key.guild_id.clone()).or_default();
        if channels.contains_key(&key.channel_id) {
            return Ok(StartOutcome::AlreadyTracked);
        }
        channels.insert(key.channel_id.clone(), ChannelState::default());
        self.persist(&table).await?;
        Ok(StartOutcome::Started)
    }

    async fn stop(&self, key: &ChannelKey) -> Result<StopOutcome> {
        let mut table = self.table.lock().await;
        let Some(channels) = table.get_mut(&key.guild_id) else {
            return Ok(StopOutcome::NotTracked);
        };
        if channels.remove(&key.channel_id).is_none() {
            return Ok(StopOutcome::NotTracked);
        }
        if channels.is_empty() {
            table.remove(&key.guild_id);
        }
        self.persist(&table).await?;
        Ok(StopOutcome::Stopped)
    }

    async fn apply(&self, key: &ChannelKey, mutation: Mutation) -> Result<ChannelState> {
        let mut table = self.table.lock().await;
        let state = table
            .get_mut(&key.guild_id)
            .and_then(|channels| channels.get_mut(&key.channel_id))
            .ok_or_else(|| Error::not_tracked(key))?;
        mutation(state);
        let state = state.clone();
        self.persist(&table).await?;
        Ok(state)
    }
}
