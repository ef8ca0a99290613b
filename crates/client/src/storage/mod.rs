//! Local key-value persistence for session and guest-cart state.
//!
//! The storefront keeps a small amount of state on the client between runs:
//! the session blob (tokens plus profile) and the guest-cart snapshot. Both
//! live behind the [`KeyValueStore`] trait so the backend can be a JSON file
//! on disk ([`FileStore`]) or process memory ([`MemoryStore`]) for tests and
//! throwaway sessions.
//!
//! Values are opaque strings; callers serialize with `serde_json` before
//! writing. Writes are synchronous relative to state changes and unbatched.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Serialized session blob (access token, refresh token, profile).
    pub const SESSION: &str = "tundra.session";
    /// Serialized guest-cart snapshot.
    pub const GUEST_CART: &str = "tundra.guest-cart";
}

/// Errors that can occur reading or writing local state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file contents could not be parsed.
    #[error("storage parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A string key-value store with synchronous reads and writes.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing an absent key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
