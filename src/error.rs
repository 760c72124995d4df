//! Typed errors for the wallet core
//!
//! `NotFound` and `Cancelled` search endings are not errors; they are
//! normal variants of [`crate::search::SearchOutcome`].

use thiserror::Error;

/// Failures the wallet core can surface to its callers
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed vanity prefix; rejected before any worker is spawned
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Wrong password, or a corrupted/tampered/unreadable wallet record.
    /// Recoverable by re-prompting; plaintext is never partially returned.
    #[error("incorrect password or corrupted wallet data")]
    Authentication,

    /// File or thread failure, surfaced with the underlying cause
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Cipher-level failure while producing a record
    #[error("encryption failure: {0}")]
    Crypto(String),
}
