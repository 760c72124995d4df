//! Configuration for the clawlet CLI
//!
//! Everything lives in fixed files next to the installed binary; a few
//! environment variables override the defaults for development and tests.
//! Nothing in the wallet core reads the environment itself.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const SETTINGS_FILENAME: &str = "clawlet_settings.json";
pub const TXLOG_FILENAME: &str = "clawlet_txlog.json";
const WALLETS_DIRNAME: &str = "wallets";

// Mainnet JSON-RPC endpoints, tried in order for redundancy.
const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://xrplcluster.com/",
    "https://s1.ripple.com:51234/",
    "https://xrpl.ws/",
];

const DEFAULT_TAG_LIST_URL: &str = "https://xrpl.ws-stats.com/lists/f:dtag_accounts_without_flag";

/// Resolved paths and endpoints
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for wallets, settings and the transaction log.
    pub data_dir: PathBuf,
    /// Ledger JSON-RPC endpoints, tried in order.
    pub endpoints: Vec<String>,
    /// Source of the destination-tag advisory list.
    pub tag_list_url: String,
}

impl Config {
    /// Resolve configuration. `CLAWLET_DATA_DIR`, `CLAWLET_ENDPOINTS`
    /// (comma separated) and `CLAWLET_TAG_LIST_URL` override the
    /// defaults; otherwise everything sits next to the binary. Creates
    /// the wallets directory if it is missing.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let data_dir = match env::var("CLAWLET_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };

        let endpoints: Vec<String> = match env::var("CLAWLET_ENDPOINTS") {
            Ok(raw) if !raw.is_empty() => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
        };

        let tag_list_url =
            env::var("CLAWLET_TAG_LIST_URL").unwrap_or_else(|_| DEFAULT_TAG_LIST_URL.to_string());

        let config = Self {
            data_dir,
            endpoints,
            tag_list_url,
        };
        fs::create_dir_all(config.wallets_dir())
            .with_context(|| format!("could not create {}", config.wallets_dir().display()))?;
        Ok(config)
    }

    pub fn wallets_dir(&self) -> PathBuf {
        self.data_dir.join(WALLETS_DIRNAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILENAME)
    }

    pub fn txlog_path(&self) -> PathBuf {
        self.data_dir.join(TXLOG_FILENAME)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("could not locate the running executable")?;
    Ok(exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")))
}
