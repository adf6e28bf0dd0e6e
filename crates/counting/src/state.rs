//! Counter table types and their wire format.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifies one counted channel: guild first, channel second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub guild_id: String,
    pub channel_id: String,
}

impl ChannelKey {
    pub fn new(guild_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}

/// Per-channel counting state.
///
/// The next expected submission is always `count + 1`. `record` never
/// decreases. `last_user` is `None` only when `count == 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub count: u64,
    pub record: u64,
    /// Who submitted the current `count`. Field name kept as `lastUser` so
    /// data files written by earlier versions of the bot still load; those
    /// used an empty string where we use `None`.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        rename = "lastUser",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_user: Option<String>,
}

impl ChannelState {
    /// Reset after a failed submission. The record is kept.
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_user = None;
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(de)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// The whole durable table: guild id -> channel id -> state.
///
/// Absence at either level means "not tracked": messages in such channels
/// are ignored entirely.
pub type CounterTable = HashMap<String, HashMap<String, ChannelState>>;
