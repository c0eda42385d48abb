//! Key/value storage abstraction.

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused a write because it is full
    #[error("quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded {
        /// Bytes the backend would hold after the write
        needed: usize,
        /// Bytes the backend may hold
        available: usize,
    },

    /// Key cannot be represented by the backend
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Backend is disabled or absent
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key/value storage.
///
/// Every `set` is a full overwrite of the key's value.
pub trait KvBackend: Send {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// List all keys.
    fn keys(&self) -> Result<Vec<String>>;
}

impl<B: KvBackend + ?Sized> KvBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}
