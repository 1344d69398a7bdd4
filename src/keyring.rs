//! OS keyring storage for the store API key.

use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "worktally-store";
const API_KEY_USER: &str = "api_key";

/// One named secret in the platform keyring.
pub struct Secret {
    entry: Entry,
    label: String,
}

impl Secret {
    pub fn open(service: &str, user: &str) -> Result<Self> {
        let entry = Entry::new(service, user)
            .with_context(|| format!("Failed to open keyring entry {}/{}", service, user))?;
        Ok(Self {
            entry,
            label: format!("{}/{}", service, user),
        })
    }

    pub fn set(&self, value: &str) -> Result<()> {
        self.entry
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keyring", self.label))
    }

    /// The stored value, or `None` when nothing was ever stored.
    pub fn get(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keyring", self.label)),
        }
    }

    /// Remove the value. Returns whether anything was there.
    pub fn clear(&self) -> Result<bool> {
        match self.entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(KeyringError::NoEntry) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keyring", self.label)),
        }
    }
}

fn api_key_secret() -> Result<Secret> {
    Secret::open(SERVICE, API_KEY_USER)
}

pub fn store_api_key(key: &str) -> Result<()> {
    api_key_secret()?.set(key)
}

pub fn get_api_key() -> Result<Option<String>> {
    api_key_secret()?.get()
}

pub fn delete_api_key() -> Result<bool> {
    api_key_secret()?.clear()
}
