//! Encrypted wallet file storage
//!
//! One directory of opaque `.dat` records, one secret per file. Writes
//! are atomic (temp file then rename), so a crash leaves either the whole
//! record or nothing visible.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Error;
use crate::wallet::encryption::EncryptionService;

/// Stem shared by every wallet file in the directory.
pub const WALLET_BASENAME: &str = "clawlet_wallet";
const WALLET_EXTENSION: &str = "dat";

/// Literal a caller must collect from the user before `delete`.
pub const DELETE_CONFIRMATION: &str = "delete";
/// Literal required by `delete_all`; anything else is a cancellation.
pub const DELETE_ALL_CONFIRMATION: &str = "deleteall";

/// One wallet file on disk
#[derive(Debug, Clone)]
pub struct WalletFileDescriptor {
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
}

impl WalletFileDescriptor {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Manages the directory of encrypted secret files
pub struct WalletStore {
    dir: PathBuf,
    crypto: EncryptionService,
}

impl WalletStore {
    pub fn new(dir: impl Into<PathBuf>, crypto: EncryptionService) -> Self {
        Self {
            dir: dir.into(),
            crypto,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The canonical path if unused, otherwise the first free
    /// `_1`, `_2`, ... suffix. Inspects the disk without reserving the
    /// slot, so repeated calls return the same path until a file appears.
    pub fn next_available_path(&self) -> PathBuf {
        let canonical = self.dir.join(format!("{WALLET_BASENAME}.{WALLET_EXTENSION}"));
        if !canonical.exists() {
            return canonical;
        }
        let mut suffix = 1u32;
        loop {
            let candidate = self
                .dir
                .join(format!("{WALLET_BASENAME}_{suffix}.{WALLET_EXTENSION}"));
            if !candidate.exists() {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Encrypt and persist a secret into the next free slot.
    pub fn save(&self, secret: &str, password: &str) -> Result<PathBuf, Error> {
        let record = self.crypto.encrypt(secret, password)?;
        let path = self.next_available_path();
        write_atomic(&path, &record)?;
        info!(path = %path.display(), "wallet secret saved");
        Ok(path)
    }

    /// Every wallet file, most recently modified first.
    pub fn list(&self) -> Result<Vec<WalletFileDescriptor>, Error> {
        let mut descriptors = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_wallet_file(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            descriptors.push(WalletFileDescriptor {
                path,
                modified_at: modified.into(),
            });
        }
        descriptors.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(descriptors)
    }

    /// Single-shot read and decrypt. Retry policy belongs to the caller.
    pub fn load(&self, path: &Path, password: &str) -> Result<String, Error> {
        let record = fs::read(path)?;
        self.crypto.decrypt(&record, password)
    }

    /// Remove one file. Missing paths are fine: the user already
    /// confirmed the deletion, there is nothing left to protect.
    pub fn delete(&self, path: &Path) -> Result<(), Error> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove every wallet file, gated on the exact confirmation literal.
    /// Any other confirmation is treated as a cancellation and leaves the
    /// directory untouched. Returns how many files were removed.
    pub fn delete_all(&self, confirmation: &str) -> Result<usize, Error> {
        if confirmation != DELETE_ALL_CONFIRMATION {
            return Ok(0);
        }
        let mut removed = 0;
        for descriptor in self.list()? {
            fs::remove_file(&descriptor.path)?;
            removed += 1;
        }
        info!(removed, "wallet files deleted");
        Ok(removed)
    }
}

fn is_wallet_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(WALLET_BASENAME)
        && path.extension().is_some_and(|ext| ext == WALLET_EXTENSION)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::encryption::KeyDerivation;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store() -> (TempDir, WalletStore) {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path(), EncryptionService::new(KeyDerivation::Legacy));
        (dir, store)
    }

    #[test]
    fn test_slot_allocation() {
        let (_dir, store) = store();
        let canonical = store.next_available_path();
        assert!(canonical.ends_with("clawlet_wallet.dat"));
        // No reservation: asking again returns the same slot.
        assert_eq!(store.next_available_path(), canonical);

        fs::write(&canonical, b"x").unwrap();
        let first = store.next_available_path();
        assert!(first.ends_with("clawlet_wallet_1.dat"));

        fs::write(&first, b"x").unwrap();
        assert!(store.next_available_path().ends_with("clawlet_wallet_2.dat"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, store) = store();
        let path = store.save("shSEEDEXAMPLE1234567890ABCDEF", "hunter2").unwrap();
        assert_eq!(
            store.load(&path, "hunter2").unwrap(),
            "shSEEDEXAMPLE1234567890ABCDEF"
        );
        assert!(matches!(
            store.load(&path, "wrong"),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, store) = store();
        let missing = store.dir().join("clawlet_wallet_9.dat");
        assert!(matches!(store.load(&missing, "pw"), Err(Error::Io(_))));
    }

    #[test]
    fn test_list_mtime_descending() {
        let (_dir, store) = store();
        let older = store.save("first", "pw").unwrap();
        thread::sleep(Duration::from_millis(25));
        let newer = store.save("second", "pw").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].path, newer);
        assert_eq!(listed[1].path, older);
    }

    #[test]
    fn test_list_ignores_unrelated() {
        let (_dir, store) = store();
        fs::write(store.dir().join("notes.txt"), b"keep").unwrap();
        fs::write(store.dir().join("clawlet_wallet.tmp"), b"partial").unwrap();
        store.save("seed", "pw").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_path() {
        let (_dir, store) = store();
        let path = store.save("seed", "pw").unwrap();
        store.delete(&path).unwrap();
        assert!(!path.exists());
        // Already gone: still fine.
        store.delete(&path).unwrap();
    }

    #[test]
    fn test_delete_all_confirmation() {
        let (_dir, store) = store();
        let first = store.save("one", "pw").unwrap();
        let second = store.save("two", "pw").unwrap();
        let before = (fs::read(&first).unwrap(), fs::read(&second).unwrap());

        for wrong in ["", "delete", "DELETEALL", "deleteall "] {
            assert_eq!(store.delete_all(wrong).unwrap(), 0);
        }
        // Untouched, byte for byte.
        assert_eq!(fs::read(&first).unwrap(), before.0);
        assert_eq!(fs::read(&second).unwrap(), before.1);

        assert_eq!(store.delete_all(DELETE_ALL_CONFIRMATION).unwrap(), 2);
        assert!(store.list().unwrap().is_empty());
    }
}
