//! API key storage for AI drafting.
//!
//! Lookup order: `PROFMAIL_API_KEY`, the OS keyring, then a `0600` file in
//! the config directory. The key is never part of the config file or the
//! binary.

use anyhow::Result;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const ENV_API_KEY: &str = "PROFMAIL_API_KEY";
const KEYRING_SERVICE: &str = "profmail";
const KEYRING_USER: &str = "ai-api-key";

/// Diagnostic information about where an API key could come from
#[derive(Debug, Clone)]
pub struct CredentialDebugInfo {
    pub env_var_set: bool,
    pub keyring_has_key: bool,
    pub file_path: PathBuf,
    pub file_exists: bool,
}

impl std::fmt::Display for CredentialDebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "API key sources:")?;
        writeln!(
            f,
            "  Environment var ({}): {}",
            ENV_API_KEY,
            if self.env_var_set { "set" } else { "not set" }
        )?;
        writeln!(
            f,
            "  Keyring: {}",
            if self.keyring_has_key {
                "stored"
            } else {
                "empty or unavailable"
            }
        )?;
        writeln!(f, "  File fallback: {}", self.file_path.display())?;
        write!(f, "  File exists: {}", self.file_exists)
    }
}

pub struct ApiKeyStore {
    key_file: PathBuf,
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStore {
    pub fn new() -> Self {
        let key_file = crate::config::Config::config_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".api_key");
        Self { key_file }
    }

    #[cfg(test)]
    fn with_file(key_file: PathBuf) -> Self {
        Self { key_file }
    }

    pub fn debug_info(&self) -> CredentialDebugInfo {
        CredentialDebugInfo {
            env_var_set: Self::env_key().is_some(),
            keyring_has_key: Self::keyring_get().is_some(),
            file_path: self.key_file.clone(),
            file_exists: self.key_file.exists(),
        }
    }

    fn env_key() -> Option<String> {
        env::var(ENV_API_KEY).ok().filter(|k| !k.trim().is_empty())
    }

    fn keyring_get() -> Option<String> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()?;
        entry.get_password().ok()
    }

    fn keyring_set(key: &str) -> bool {
        match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
            Ok(entry) => entry.set_password(key).is_ok(),
            Err(_) => false,
        }
    }

    fn file_get(&self) -> Option<String> {
        fs::read_to_string(&self.key_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Write the key file with owner-only permissions
    fn file_set(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.key_file.parent() {
            fs::create_dir_all(parent)?;
        }

        #[cfg(unix)]
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.key_file)?;
            file.write_all(key.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            let mut file = fs::File::create(&self.key_file)?;
            file.write_all(key.as_bytes())?;
        }

        Ok(())
    }

    /// The API key, if one is configured anywhere
    pub fn get(&self) -> Option<String> {
        if let Some(key) = Self::env_key() {
            return Some(key);
        }
        if let Some(key) = Self::keyring_get() {
            return Some(key);
        }
        self.file_get()
    }

    pub fn set(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("API key is empty");
        }

        if Self::keyring_set(key) && Self::keyring_get().as_deref() == Some(key) {
            return Ok(());
        }

        eprintln!("Note: Keyring unavailable, using file-based storage.");
        tracing::warn!("Keyring unavailable, storing API key in {}", self.key_file.display());
        self.file_set(key)
    }
}
