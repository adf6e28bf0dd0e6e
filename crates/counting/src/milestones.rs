//! Cosmetic reaction overrides for specific counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Counts that get a special reaction instead of the usual check mark.
///
/// Pure presentation flavor: the override picks the emoji shown, never the
/// state written. Carried as configuration data so the transition rules stay
/// independent of it.
///
/// Serialized as a map with string keys ("100" -> "💯") because TOML and
/// YAML config tables only carry string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestones(pub BTreeMap<u64, String>);

impl Milestones {
    /// Reaction override for `count`, if it is a milestone.
    pub fn reaction_for(&self, count: u64) -> Option<&str> {
        self.0.get(&count).map(String::as_str)
    }
}

impl Default for Milestones {
    fn default() -> Self {
        Self(BTreeMap::from([
            (69, "♋".to_string()),
            (100, "💯".to_string()),
            (420, "🌿".to_string()),
            (666, "💀".to_string()),
            (1337, "💩".to_string()),
        ]))
    }
}

impl Serialize for Milestones {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(count, emoji)| (count.to_string(), emoji)))
    }
}

impl<'de> Deserialize<'de> for Milestones {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(de)?;
        let mut table = BTreeMap::new();
        for (count, emoji) in raw {
            let count = count
                .parse::<u64>()
                .map_err(|_| D::Error::custom(format!("milestone key is not a count: {count:?}")))?;
            table.insert(count, emoji);
        }
        Ok(Self(table))
    }
}
