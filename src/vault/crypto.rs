//! Sealing of vault values with AES-256-GCM.
//!
//! A sealed value is the base64 encoding of `nonce (12 bytes) || ciphertext`.
//! The 256-bit key lives hex-encoded in a key file next to the database.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::Engine;
use rand::RngCore;
use sharestream_common::{Error, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric key used to seal every vault value.
#[derive(Clone)]
pub struct VaultKey {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

impl VaultKey {
    pub fn from_bytes(bytes: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(bytes)),
        }
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self::from_bytes(&random_key())
    }

    /// Read the key file, creating it with a random key on first use.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let bytes = hex::decode(raw.trim())
                .map_err(|e| Error::crypto(format!("invalid key file {:?}: {}", path, e)))?;
            let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
                Error::crypto(format!("key file {:?} does not hold a 256-bit key", path))
            })?;
            return Ok(Self::from_bytes(&bytes));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = random_key();
        let mut file = create_key_file(path)?;
        file.write_all(hex::encode(bytes).as_bytes())?;
        file.sync_all()?;
        tracing::info!("Created vault key at {:?}", path);

        Ok(Self::from_bytes(&bytes))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::crypto(format!("encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(combined))
    }

    /// Decrypt a value produced by [`VaultKey::seal`].
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(sealed)
            .map_err(|e| Error::crypto(format!("invalid base64: {}", e)))?;

        if combined.len() <= NONCE_LEN {
            return Err(Error::crypto("sealed value too short"));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::crypto(format!("decryption failed: {}", e)))
    }

    pub fn seal_str(&self, plaintext: &str) -> Result<String> {
        self.seal(plaintext.as_bytes())
    }

    pub fn open_str(&self, sealed: &str) -> Result<String> {
        String::from_utf8(self.open(sealed)?)
            .map_err(|e| Error::crypto(format!("invalid UTF-8: {}", e)))
    }
}

fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Create a new key file that only the owner can read, from the first byte.
fn create_key_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let key = VaultKey::generate();
        let a = key.seal_str("secret").unwrap();
        let b = key.seal_str("secret").unwrap();
        assert_ne!(a, b);
        assert_eq!(key.open_str(&a).unwrap(), "secret");
        assert_eq!(key.open_str(&b).unwrap(), "secret");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = VaultKey::generate().seal_str("secret").unwrap();
        let err = VaultKey::generate().open_str(&sealed).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let key = VaultKey::generate();
        assert!(key.open("not base64!").is_err());
        assert!(key.open("AAAA").is_err());
    }

    #[test]
    fn test_key_file_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/vault.key");

        let first = VaultKey::load_or_create(&path).unwrap();
        let sealed = first.seal_str("x").unwrap();

        let second = VaultKey::load_or_create(&path).unwrap();
        assert_eq!(second.open_str(&sealed).unwrap(), "x");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private_before_any_write() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.key");

        let file = create_key_file(&path).unwrap();
        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(file.metadata().unwrap().len(), 0);

        assert!(create_key_file(&path).is_err());
    }

    #[test]
    fn test_rejects_short_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.key");
        std::fs::write(&path, "abcd").unwrap();
        assert!(VaultKey::load_or_create(&path).is_err());
    }
}
