//! User settings persisted as JSON
//!
//! Loading merges whatever is on disk over the defaults, so new keys can
//! be added without migrating old files. A corrupted file logs a warning
//! and yields the defaults instead of failing the program.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One saved destination in the address book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentAddress {
    pub nickname: String,
    pub address: String,
    /// Destination tags this recipient is known to use.
    #[serde(default)]
    pub tags: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Saved destinations selectable from the send menu.
    pub frequent_addresses: Vec<FrequentAddress>,
    /// Skip destination-tag prompts entirely.
    pub never_require_tag: bool,
    /// Warn on suspicious destination tags before sending.
    pub sanity_check_tag: bool,
    /// Record outgoing transactions in the local log.
    pub tx_log_enabled: bool,
    /// Encrypt new wallet files with the salted Argon2id mode instead of
    /// the legacy deterministic key. Existing files keep decrypting
    /// either way.
    pub hardened_encryption: bool,
    /// Extra diagnostics in the send flows.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequent_addresses: Vec::new(),
            never_require_tag: false,
            sanity_check_tag: true,
            tx_log_enabled: true,
            hardened_encryption: false,
            debug: false,
        }
    }
}

impl Settings {
    /// Load from `path`, filling missing keys from the defaults. Never
    /// fails: unreadable or unparseable files degrade to defaults.
    pub fn load(path: &Path) -> Settings {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not parse settings, using defaults");
                    Settings::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read settings, using defaults");
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("could not serialize settings")?;
        fs::write(path, raw).with_context(|| format!("could not write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json"));
        assert!(settings.sanity_check_tag);
        assert!(settings.tx_log_enabled);
        assert!(!settings.never_require_tag);
        assert!(!settings.hardened_encryption);
    }

    #[test]
    fn test_partial_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "never_require_tag": true }"#).unwrap();

        let settings = Settings::load(&path);
        assert!(settings.never_require_tag);
        // Untouched keys keep their defaults.
        assert!(settings.tx_log_enabled);
        assert!(settings.frequent_addresses.is_empty());
    }

    #[test]
    fn test_corrupt_file_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let settings = Settings::load(&path);
        assert!(settings.sanity_check_tag);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.hardened_encryption = true;
        settings.frequent_addresses.push(FrequentAddress {
            nickname: "exchange".into(),
            address: "rExampleExchangeAddr1234567".into(),
            tags: vec![7, 42],
        });
        settings.save(&path).unwrap();

        let reloaded = Settings::load(&path);
        assert!(reloaded.hardened_encryption);
        assert_eq!(reloaded.frequent_addresses, settings.frequent_addresses);
    }
}
