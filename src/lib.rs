//! clawlet library
//!
//! A personal command-line credential manager and vanity address
//! generator for the XRP Ledger:
//!
//! 1. **Vanity search**: race worker threads generating random keypairs
//!    until one claims an address with the requested prefix.
//! 2. **Encrypted wallet store**: password-derived AES-256-GCM records,
//!    one secret per `.dat` file, with guarded deletion.
//!
//! Around the core sit the settings store, the transaction log and a
//! failover JSON-RPC ledger client.

pub mod config;
pub mod error;
pub mod keygen;
pub mod ledger;
pub mod menu;
pub mod search;
pub mod settings;
pub mod txlog;
pub mod wallet;

pub use config::Config;
pub use error::Error;
pub use keygen::{Candidate, Keypair, KeypairGenerator};
pub use ledger::{AccountState, LedgerClient, SubmitResult};
pub use search::{
    CancellationToken, SearchCoordinator, SearchOutcome, SearchRequest, SearchResult,
};
pub use settings::{FrequentAddress, Settings};
pub use txlog::{TxLog, TxLogEntry};
pub use wallet::{EncryptionService, KeyDerivation, WalletFileDescriptor, WalletStore};
