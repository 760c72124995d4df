//! Encrypted wallet storage
//!
//! Password-derived encryption of secrets and the directory of `.dat`
//! records they are kept in.

mod encryption;
mod store;

pub use encryption::{EncryptionService, KeyDerivation};
pub use store::{
    WalletFileDescriptor, WalletStore, DELETE_ALL_CONFIRMATION, DELETE_CONFIRMATION,
    WALLET_BASENAME,
};
