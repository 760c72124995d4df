//! Append-only transaction log
//!
//! A JSON array on disk, one entry per submitted transaction. A
//! corrupted log is reset with a warning rather than blocking sends.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxLogEntry {
    pub timestamp: DateTime<Utc>,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_xrp: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub account_delete: bool,
}

impl TxLogEntry {
    pub fn payment(destination: &str, amount_xrp: Decimal, destination_tag: Option<u32>) -> Self {
        Self {
            timestamp: Utc::now(),
            destination: destination.to_string(),
            amount_xrp: Some(amount_xrp),
            destination_tag,
            hash: None,
            result: String::new(),
            error: None,
            account_delete: false,
        }
    }

    pub fn account_delete(destination: &str, amount_xrp: Option<Decimal>) -> Self {
        Self {
            timestamp: Utc::now(),
            destination: destination.to_string(),
            amount_xrp,
            destination_tag: None,
            hash: None,
            result: String::new(),
            error: None,
            account_delete: true,
        }
    }

    pub fn with_result(mut self, result: &str, hash: Option<String>) -> Self {
        self.result = result.to_string();
        self.hash = hash;
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.result = "ERROR".to_string();
        self.error = Some(error.to_string());
        self
    }
}

/// The log file; whether anything gets logged at all is the caller's
/// (settings-driven) decision.
pub struct TxLog {
    path: PathBuf,
}

impl TxLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, entry: TxLogEntry) -> Result<()> {
        let mut entries = self.read_all();
        entries.push(entry);
        let raw = serde_json::to_string_pretty(&entries).context("could not serialize log")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("could not write {}", self.path.display()))?;
        Ok(())
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<TxLogEntry> {
        let entries = self.read_all();
        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }

    fn read_all(&self) -> Vec<TxLogEntry> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "transaction log corrupted, resetting");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "could not read transaction log");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn log() -> (TempDir, TxLog) {
        let dir = TempDir::new().unwrap();
        let log = TxLog::new(dir.path().join("txlog.json"));
        (dir, log)
    }

    #[test]
    fn test_append_order() {
        let (_dir, log) = log();
        for n in 0..5u32 {
            log.append(
                TxLogEntry::payment(&format!("rDest{n}"), dec!(1.5), Some(n))
                    .with_result("tesSUCCESS", Some(format!("HASH{n}"))),
            )
            .unwrap();
        }
        let entries = log.recent(20);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].destination, "rDest0");
        assert_eq!(entries[4].destination, "rDest4");
        assert_eq!(entries[4].hash.as_deref(), Some("HASH4"));
    }

    #[test]
    fn test_recent_limit() {
        let (_dir, log) = log();
        for n in 0..25u32 {
            log.append(TxLogEntry::payment(&format!("rDest{n}"), dec!(0.1), None)).unwrap();
        }
        let entries = log.recent(20);
        assert_eq!(entries.len(), 20);
        // The oldest five fell off the view.
        assert_eq!(entries[0].destination, "rDest5");
    }

    #[test]
    fn test_corrupted_log_resets() {
        let (dir, log) = log();
        fs::write(dir.path().join("txlog.json"), "[{ broken").unwrap();
        log.append(TxLogEntry::payment("rDest", dec!(2), None).with_error("timeout"))
            .unwrap();
        let entries = log.recent(20);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result, "ERROR");
        assert_eq!(entries[0].error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_account_delete_marker() {
        let (_dir, log) = log();
        log.append(
            TxLogEntry::account_delete("rDest", Some(dec!(11.8))).with_result("tesSUCCESS", None),
        )
        .unwrap();
        assert!(log.recent(1)[0].account_delete);
    }
}
