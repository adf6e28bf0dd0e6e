//! Config discovery and parsing.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, schema::TallyConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["tally.toml", "tally.yaml", "tally.yml", "tally.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<TallyConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tally.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/tally/tally.{toml,yaml,yml,json}` (user-global)
///
/// Returns `TallyConfig::default()` if no config file is found.
pub fn discover_and_load() -> TallyConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    TallyConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/tally/
    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/tally/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tally").map(|d| d.config_dir().to_path_buf())
}

/// Directory holding the counter state file: the configured `data_dir`, or
/// `~/.tally/` when unset.
pub fn data_dir(config: &TallyConfig) -> PathBuf {
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tally")
}

fn parse_config(raw: &str, path: &Path) -> Result<TallyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| Error::Parse {
        path: path.display().to_string(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
