//! Durable credential storage for the refresh token
//!
//! The refresh token is the only persisted session state. It lives under a
//! fixed key in an AES-256-GCM encrypted file (`~/.config/feedline/credentials.enc`)
//! whose key is derived from machine-specific identifiers.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::paths;

/// Key of the refresh token entry in secure storage
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

const NONCE_SIZE: usize = 12;

/// Secure, persistent storage for the refresh token
///
/// Calls are synchronous so the refresh coordinator can read the token before
/// it yields to the runtime.
pub trait CredentialStore: Send + Sync {
    /// Read the stored refresh token
    fn refresh_token(&self) -> Result<Option<String>>;

    /// Replace the stored refresh token
    fn set_refresh_token(&self, token: &str) -> Result<()>;

    /// Remove the stored refresh token
    fn delete_refresh_token(&self) -> Result<()>;
}

/// Encrypted file-backed credential store
#[derive(Debug, Clone)]
pub struct EncryptedFileStore {
    path: PathBuf,
}

impl EncryptedFileStore {
    /// Store at the default location
    pub fn open() -> anyhow::Result<Self> {
        Ok(Self::at(paths::credentials_path()?))
    }

    /// Store at a specific path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the encrypted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let encrypted = fs::read(&self.path).context("Failed to read credentials file")?;

        if encrypted.len() < NONCE_SIZE {
            return Ok(HashMap::new());
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&derive_key())
            .map_err(|_| anyhow!("Invalid key length"))?;

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt credentials"))?;

        let json = String::from_utf8(plaintext).context("Invalid UTF-8 in credentials")?;
        let creds: HashMap<String, String> = serde_json::from_str(&json)?;

        Ok(creds)
    }

    fn save(&self, creds: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create credentials directory")?;
        }

        let json = serde_json::to_string(creds)?;

        let cipher = Aes256Gcm::new_from_slice(&derive_key())
            .map_err(|_| anyhow!("Invalid key length"))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, json.as_bytes())
            .map_err(|_| anyhow!("Failed to encrypt credentials"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        fs::write(&self.path, output).context("Failed to write credentials file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

impl CredentialStore for EncryptedFileStore {
    fn refresh_token(&self) -> Result<Option<String>> {
        let creds = self.load().map_err(|e| Error::storage(format!("{e:#}")))?;
        Ok(creds.get(REFRESH_TOKEN_KEY).cloned())
    }

    fn set_refresh_token(&self, token: &str) -> Result<()> {
        // An unreadable file is replaced rather than blocking a fresh login
        let mut creds = self.load().unwrap_or_default();
        creds.insert(REFRESH_TOKEN_KEY.to_string(), token.to_string());
        self.save(&creds)
            .map_err(|e| Error::storage(format!("{e:#}")))
    }

    fn delete_refresh_token(&self) -> Result<()> {
        let mut creds = match self.load() {
            Ok(creds) => creds,
            Err(e) => {
                // Nothing in an unreadable file can be recovered, drop it whole
                let reason = format!("{e:#}");
                tracing::warn!(error = %reason, "Removing unreadable credentials file");
                return match fs::remove_file(&self.path) {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::storage(e)),
                    _ => Ok(()),
                };
            }
        };
        if creds.remove(REFRESH_TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.save(&creds)
            .map_err(|e| Error::storage(format!("{e:#}")))
    }
}

/// In-memory credential store (ephemeral sessions and tests)
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a refresh token
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn refresh_token(&self) -> Result<Option<String>> {
        let guard = self.token.lock().map_err(Error::storage)?;
        Ok(guard.clone())
    }

    fn set_refresh_token(&self, token: &str) -> Result<()> {
        let mut guard = self.token.lock().map_err(Error::storage)?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn delete_refresh_token(&self) -> Result<()> {
        let mut guard = self.token.lock().map_err(Error::storage)?;
        *guard = None;
        Ok(())
    }
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    // Linux: /etc/machine-id or /var/lib/dbus/machine-id
    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            return id.trim().to_string();
        }
        if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return id.trim().to_string();
        }
    }

    // macOS: IOPlatformUUID via ioreg
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("IOPlatformUUID") {
                    if let Some(uuid) = line.split('"').nth(3) {
                        return uuid.to_string();
                    }
                }
            }
        }
    }

    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "feedline-fallback-key".to_string())
}

/// Derive encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();

    hasher.update(get_machine_id().as_bytes());

    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    hasher.update(b"feedline-session-v1");

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = EncryptedFileStore::at(dir.path().join("credentials.enc"));

        assert_eq!(store.refresh_token().unwrap(), None);

        store.set_refresh_token("rt-1").unwrap();
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("rt-1"));

        // Rotation replaces the old value
        store.set_refresh_token("rt-2").unwrap();
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("rt-2"));

        store.delete_refresh_token().unwrap();
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_delete_removes_undecryptable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        fs::write(&path, b"not a valid credentials payload at all").unwrap();
        let store = EncryptedFileStore::at(&path);

        assert!(matches!(store.refresh_token(), Err(Error::Storage(_))));

        store.delete_refresh_token().unwrap();
        assert!(!path.exists());
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        let store = EncryptedFileStore::at(&path);

        store.set_refresh_token("super-secret-refresh").unwrap();

        let raw = fs::read(&path).unwrap();
        let needle = b"super-secret-refresh";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        EncryptedFileStore::at(&path)
            .set_refresh_token("rt")
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_delete_without_file_is_ok() {
        let dir = tempdir().unwrap();
        let store = EncryptedFileStore::at(dir.path().join("missing.enc"));
        store.delete_refresh_token().unwrap();
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::with_token("rt-a");
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("rt-a"));
        store.delete_refresh_token().unwrap();
        assert_eq!(store.refresh_token().unwrap(), None);
    }
}
