//! Keypair and address generation
//!
//! Produces fresh (address, secret) pairs for the ledger's address space.
//! Addresses are base58check in the ledger alphabet and always begin with
//! the reserved leading character `r`; secrets are family-seed encodings
//! of 16 bytes of entropy and begin with `s`. The secret alone is enough
//! to re-derive the full keypair.

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// First character of every valid account address.
pub const RESERVED_LEADING_CHAR: char = 'r';

/// Base58 alphabet used by the ledger (no 0, O, I or l).
pub const ADDRESS_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

const ACCOUNT_ID_PREFIX: u8 = 0x00;
const FAMILY_SEED_PREFIX: u8 = 0x21;
const ED25519_KEY_MARKER: u8 = 0xED;
const ENTROPY_LEN: usize = 16;
const ACCOUNT_ID_LEN: usize = 20;

/// One freshly generated (address, secret) pair
#[derive(Debug, Clone)]
pub struct Candidate {
    pub address: String,
    pub secret: String,
}

/// Source of candidates for the vanity search.
///
/// The production implementation draws OS randomness; tests substitute
/// scripted sequences.
pub trait KeypairGenerator: Send {
    fn generate(&mut self) -> Candidate;
}

/// Production generator backed by the thread-local CSPRNG
#[derive(Debug, Default)]
pub struct LedgerKeypairGenerator;

impl KeypairGenerator for LedgerKeypairGenerator {
    fn generate(&mut self) -> Candidate {
        let keypair = Keypair::generate();
        Candidate {
            address: keypair.address,
            secret: keypair.secret,
        }
    }
}

/// A usable account keypair. The secret is the only piece that needs
/// protecting at rest; the address is public.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub address: String,
    pub secret: String,
}

impl Keypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        let mut entropy = [0u8; ENTROPY_LEN];
        rand::thread_rng().fill_bytes(&mut entropy);
        Self::from_entropy(&entropy)
    }

    /// Re-derive the keypair from a stored secret.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let entropy = decode_seed(secret)?;
        Ok(Self::from_entropy(&entropy))
    }

    fn from_entropy(entropy: &[u8; ENTROPY_LEN]) -> Self {
        let signing = signing_key_from_entropy(entropy);
        let address = address_from_public_key(signing.verifying_key().as_bytes());
        Self {
            address,
            secret: encode_seed(entropy),
        }
    }
}

fn signing_key_from_entropy(entropy: &[u8; ENTROPY_LEN]) -> SigningKey {
    // Half of SHA-512 over the seed entropy is the signing key.
    let digest = Sha512::digest(entropy);
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest[..32]);
    SigningKey::from_bytes(&key)
}

fn address_from_public_key(public_key: &[u8; 32]) -> String {
    let mut prefixed = [0u8; 33];
    prefixed[0] = ED25519_KEY_MARKER;
    prefixed[1..].copy_from_slice(public_key);
    let digest = Sha256::digest(prefixed);

    let mut payload = [0u8; 1 + ACCOUNT_ID_LEN];
    payload[0] = ACCOUNT_ID_PREFIX;
    payload[1..].copy_from_slice(&digest[..ACCOUNT_ID_LEN]);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

fn encode_seed(entropy: &[u8; ENTROPY_LEN]) -> String {
    let mut payload = [0u8; 1 + ENTROPY_LEN];
    payload[0] = FAMILY_SEED_PREFIX;
    payload[1..].copy_from_slice(entropy);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

fn decode_seed(secret: &str) -> Result<[u8; ENTROPY_LEN]> {
    let payload = bs58::decode(secret.trim())
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .context("not a valid wallet secret")?;
    if payload.len() != 1 + ENTROPY_LEN || payload[0] != FAMILY_SEED_PREFIX {
        bail!("not a valid wallet secret");
    }
    let mut entropy = [0u8; ENTROPY_LEN];
    entropy.copy_from_slice(&payload[1..]);
    Ok(entropy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_address_shape() {
        for _ in 0..8 {
            let keypair = Keypair::generate();
            assert!(keypair.address.starts_with(RESERVED_LEADING_CHAR));
            assert!(keypair.secret.starts_with('s'));
            assert!((25..=35).contains(&keypair.address.len()));
        }
    }

    #[test]
    fn test_secret_round_trip() {
        let keypair = Keypair::generate();
        let recovered = Keypair::from_secret(&keypair.secret).unwrap();
        assert_eq!(keypair.address, recovered.address);
        assert_eq!(keypair.secret, recovered.secret);
    }

    #[test]
    fn test_invalid_secrets_rejected() {
        assert!(Keypair::from_secret("not a secret").is_err());
        assert!(Keypair::from_secret("").is_err());
        // Valid base58 but wrong payload shape
        assert!(Keypair::from_secret("rrrrrrrrrrrr").is_err());
    }

    #[test]
    fn test_distinct_candidates() {
        let mut generator = LedgerKeypairGenerator;
        let first = generator.generate();
        let second = generator.generate();
        assert_ne!(first.address, second.address);
        assert_ne!(first.secret, second.secret);
    }
}
