//! YAML configuration.
//!
//! Schema:
//!
//! ```yaml
//! magazine:
//!   cd1: org.mpris.MediaPlayer2.spotify
//!   cd4: org.mpris.MediaPlayer2.vlc
//! ```
//!
//! Unknown sections and unknown keys inside `magazine` produce warnings.
//! An empty magazine only becomes an error at startup, after the whole file
//! has been reported on.

use std::fs;
use std::path::{Path, PathBuf};

use ibus_protocol::MAGAZINE_SIZE;
use serde::Deserialize;
use serde_yaml::Mapping;
use tracing::warn;

use crate::error::AgentError;

const SLOT_COUNT: usize = MAGAZINE_SIZE as usize;

/// Slot keys of the `magazine` section, in slot order.
const SLOT_KEYS: [&str; SLOT_COUNT] = ["cd1", "cd2", "cd3", "cd4", "cd5", "cd6"];

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    magazine: Mapping,
    #[serde(flatten)]
    unknown: Mapping,
}

/// Validated agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Player bus name configured for each slot.
    pub slots: [Option<String>; SLOT_COUNT],
}

impl Config {
    /// True when no slot has a player configured.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

/// Load and validate the config file at `path`.
pub fn load(path: &Path) -> Result<Config, AgentError> {
    let text = fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text)
}

fn parse(text: &str) -> Result<Config, AgentError> {
    let raw: RawConfig = serde_yaml::from_str(text)?;

    for key in raw.unknown.keys() {
        warn!(section = ?key, "ignoring unknown config section");
    }

    let mut slots: [Option<String>; SLOT_COUNT] = Default::default();
    for (key, value) in &raw.magazine {
        let Some(index) = key
            .as_str()
            .and_then(|k| SLOT_KEYS.iter().position(|slot| *slot == k))
        else {
            warn!(key = ?key, "ignoring unknown magazine key");
            continue;
        };
        let Some(name) = value.as_str() else {
            warn!(key = SLOT_KEYS[index], "magazine entry is not a string");
            continue;
        };
        slots[index] = Some(name.to_string());
    }

    Ok(Config { slots })
}

/// Locate the config file: `$XDG_CONFIG_HOME/cdc/cdc.yaml` (or the platform
/// equivalent), then `/etc/cdc.yaml`.
pub fn default_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("cdc").join("cdc.yaml");
        if path.exists() {
            return Some(path);
        }
    }
    let etc = PathBuf::from("/etc/cdc.yaml");
    etc.exists().then_some(etc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_magazine() {
        let config = parse(
            "magazine:\n  cd1: org.mpris.MediaPlayer2.spotify\n  cd4: org.mpris.MediaPlayer2.vlc\n",
        )
        .unwrap();
        assert_eq!(config.slots[0].as_deref(), Some("org.mpris.MediaPlayer2.spotify"));
        assert_eq!(config.slots[1], None);
        assert_eq!(config.slots[3].as_deref(), Some("org.mpris.MediaPlayer2.vlc"));
        assert!(!config.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_skipped_not_fatal() {
        let config = parse(
            "magazine:\n  cd2: org.mpris.MediaPlayer2.vlc\n  cd9: nope\n  volume: high\nradio:\n  station: 1\n",
        )
        .unwrap();
        assert_eq!(config.slots[1].as_deref(), Some("org.mpris.MediaPlayer2.vlc"));
        assert_eq!(config.slots.iter().filter(|s| s.is_some()).count(), 1);
    }

    #[test]
    fn test_non_string_entry_is_skipped() {
        let config = parse("magazine:\n  cd1: 42\n  cd2: org.mpris.MediaPlayer2.vlc\n").unwrap();
        assert_eq!(config.slots[0], None);
        assert_eq!(config.slots[1].as_deref(), Some("org.mpris.MediaPlayer2.vlc"));
    }

    #[test]
    fn test_missing_magazine_section_parses_empty() {
        let config = parse("radio:\n  station: 1\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(parse("magazine: [not a map").is_err());
    }
}
