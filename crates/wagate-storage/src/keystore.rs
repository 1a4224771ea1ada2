// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keystore key resolution.
//!
//! The key comes from `storage.keystore_key` when configured. Otherwise a
//! key file next to the database (`<db>.key`, hex, mode 0600) is created on
//! first start and reused afterwards.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;
use wagate_core::WagateError;
use zeroize::Zeroizing;

use crate::crypto;

/// A 256-bit keystore key, wiped on drop.
pub type KeystoreKey = Zeroizing<[u8; 32]>;

fn key_err(message: impl Into<String>) -> WagateError {
    WagateError::Config(message.into())
}

/// Decode a 64-character hex key.
pub fn parse_hex_key(hex_key: &str) -> Result<KeystoreKey, WagateError> {
    let bytes = Zeroizing::new(
        hex::decode(hex_key.trim()).map_err(|e| key_err(format!("keystore key is not hex: {e}")))?,
    );
    let mut key = Zeroizing::new([0u8; 32]);
    if bytes.len() != key.len() {
        return Err(key_err(format!(
            "keystore key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Path of the key file that belongs to `database`.
pub fn key_file_path(database: &Path) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(".key");
    PathBuf::from(name)
}

/// Resolve the keystore key from configuration or the key file.
pub fn resolve_key(configured: Option<&str>, database: &Path) -> Result<KeystoreKey, WagateError> {
    if let Some(hex_key) = configured {
        return parse_hex_key(hex_key);
    }

    let path = key_file_path(database);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let contents = Zeroizing::new(contents);
            parse_hex_key(&contents)
                .map_err(|e| key_err(format!("invalid key file {}: {e}", path.display())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_key_file(&path),
        Err(e) => Err(WagateError::Storage {
            source: Box::new(e),
        }),
    }
}

fn create_key_file(path: &Path) -> Result<KeystoreKey, WagateError> {
    let key = Zeroizing::new(crypto::generate_key()?);
    let encoded = Zeroizing::new(hex::encode(*key));

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| WagateError::Storage {
            source: Box::new(e),
        })?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| WagateError::Storage {
        source: Box::new(e),
    })?;
    file.write_all(encoded.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| WagateError::Storage {
            source: Box::new(e),
        })?;

    info!(path = %path.display(), "created keystore key file");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn configured_key_wins() {
        let dir = tempdir().unwrap();
        let hex_key = "11".repeat(32);
        let key = resolve_key(Some(&hex_key), &dir.path().join("db.sqlite")).unwrap();
        assert_eq!(*key, [0x11; 32]);
        assert!(!key_file_path(&dir.path().join("db.sqlite")).exists());
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(parse_hex_key("abcd").is_err());
        assert!(parse_hex_key("zz").is_err());
    }

    #[test]
    fn key_file_is_created_once() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("data/wagate.db");
        let first = resolve_key(None, &db).unwrap();
        let second = resolve_key(None, &db).unwrap();
        assert_eq!(*first, *second);
        assert_eq!(key_file_path(&db), dir.path().join("data/wagate.db.key"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(key_file_path(&db)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("wagate.db");
        std::fs::write(key_file_path(&db), "not-hex").unwrap();
        assert!(resolve_key(None, &db).is_err());
    }
}
