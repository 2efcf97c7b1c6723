//! Secure Store
//!
//! Key-value capability for persisting credentials, with in-memory, mock and
//! platform keychain implementations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;

/// Secure string/integer store (for dependency injection).
///
/// Implementations must tolerate reads interleaved with writes from other
/// threads.
pub trait SecureStore: Send + Sync {
    /// Read a string value.
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Read an integer value.
    fn get_integer(&self, key: &str) -> Result<Option<i64>, StorageError>;

    /// Write a string value.
    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Write an integer value.
    fn set_integer(&self, key: &str, value: i64) -> Result<(), StorageError>;

    /// Remove a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Integer(i64),
}

/// In-memory secure store implementation.
#[derive(Default)]
pub struct InMemorySecureStore {
    values: Mutex<HashMap<String, StoredValue>>,
}

impl InMemorySecureStore {
    /// Create new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value for a key.
    pub fn value(&self, key: &str) -> Option<StoredValue> {
        self.values().get(key).cloned()
    }

    /// All stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.values().keys().cloned().collect()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredValue>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SecureStore for InMemorySecureStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.values().get(key) {
            None => Ok(None),
            Some(StoredValue::Text(value)) => Ok(Some(value.clone())),
            Some(StoredValue::Integer(_)) => Err(StorageError::CorruptedData {
                key: key.to_string(),
                message: "expected string, found integer".to_string(),
            }),
        }
    }

    fn get_integer(&self, key: &str) -> Result<Option<i64>, StorageError> {
        match self.values().get(key) {
            None => Ok(None),
            Some(StoredValue::Integer(value)) => Ok(Some(*value)),
            Some(StoredValue::Text(_)) => Err(StorageError::CorruptedData {
                key: key.to_string(),
                message: "expected integer, found string".to_string(),
            }),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values()
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
        Ok(())
    }

    fn set_integer(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.values()
            .insert(key.to_string(), StoredValue::Integer(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Secure store operation recorded by [`MockSecureStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    Get(String),
    Set(String),
    Remove(String),
}

/// Mock secure store for testing.
#[derive(Default)]
pub struct MockSecureStore {
    inner: InMemorySecureStore,
    history: Mutex<Vec<StoreOperation>>,
    failing_writes: Mutex<HashSet<String>>,
    should_fail: Mutex<bool>,
}

impl MockSecureStore {
    /// Create new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every operation.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Fail writes to a specific key.
    pub fn fail_writes_to(&self, key: &str) -> &Self {
        self.failing_writes.lock().unwrap().insert(key.to_string());
        self
    }

    /// Pre-populate a string value.
    pub fn with_string(&self, key: &str, value: &str) -> &Self {
        let _ = self.inner.set_string(key, value);
        self
    }

    /// Pre-populate an integer value.
    pub fn with_integer(&self, key: &str, value: i64) -> &Self {
        let _ = self.inner.set_integer(key, value);
        self
    }

    /// Raw value for a key, bypassing history.
    pub fn value(&self, key: &str) -> Option<StoredValue> {
        self.inner.value(key)
    }

    /// Get operation history.
    pub fn get_history(&self) -> Vec<StoreOperation> {
        self.history.lock().unwrap().clone()
    }

    /// Clear operation history.
    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
    }

    fn record(&self, operation: StoreOperation) {
        self.history.lock().unwrap().push(operation);
    }

    fn check_read(&self, key: &str) -> Result<(), StorageError> {
        if *self.should_fail.lock().unwrap() {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if *self.should_fail.lock().unwrap() || self.failing_writes.lock().unwrap().contains(key) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(())
    }
}

impl SecureStore for MockSecureStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.record(StoreOperation::Get(key.to_string()));
        self.check_read(key)?;
        self.inner.get_string(key)
    }

    fn get_integer(&self, key: &str) -> Result<Option<i64>, StorageError> {
        self.record(StoreOperation::Get(key.to_string()));
        self.check_read(key)?;
        self.inner.get_integer(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.record(StoreOperation::Set(key.to_string()));
        self.check_write(key)?;
        self.inner.set_string(key, value)
    }

    fn set_integer(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.record(StoreOperation::Set(key.to_string()));
        self.check_write(key)?;
        self.inner.set_integer(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.record(StoreOperation::Remove(key.to_string()));
        if *self.should_fail.lock().unwrap() {
            return Err(StorageError::DeleteFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        self.inner.remove(key)
    }
}

/// Platform keychain store (macOS Keychain, Windows Credential Manager,
/// kernel keyutils on Linux).
///
/// Every key becomes one keychain entry under `service`. Integers are stored
/// as decimal strings.
#[cfg(feature = "keychain")]
pub struct KeyringSecureStore {
    service: String,
}

#[cfg(feature = "keychain")]
impl KeyringSecureStore {
    /// Create a store for a keychain service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key).map_err(|e| StorageError::ReadFailed {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(feature = "keychain")]
impl SecureStore for KeyringSecureStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        tracing::debug!(service = %self.service, key = %key, "Reading keychain entry");
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn get_integer(&self, key: &str) -> Result<Option<i64>, StorageError> {
        match self.get_string(key)? {
            None => Ok(None),
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|e| StorageError::CorruptedData {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tracing::debug!(service = %self.service, key = %key, "Writing keychain entry");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn set_integer(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.set_string(key, &value.to_string())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        tracing::debug!(service = %self.service, key = %key, "Deleting keychain entry");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Create in-memory secure store.
pub fn create_in_memory_store() -> InMemorySecureStore {
    InMemorySecureStore::new()
}

/// Create mock secure store for testing.
pub fn create_mock_store() -> MockSecureStore {
    MockSecureStore::new()
}
