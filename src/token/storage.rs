//! Session Storage
//!
//! Maps a [`Session`] onto three secure store entries under a key prefix.

use chrono::DateTime;
use std::sync::Arc;

use crate::core::SecureStore;
use crate::error::StorageError;
use crate::types::{Session, SessionKeys};

/// Persists one session in a secure store.
///
/// The refresh token and expiry are written and cleared as a pair: after any
/// `save`, either both entries exist or neither does.
pub struct SessionStore<S: SecureStore> {
    store: Arc<S>,
    keys: SessionKeys,
}

impl<S: SecureStore> SessionStore<S> {
    /// Create a session store over `store` using `keys`.
    pub fn new(store: Arc<S>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }

    /// Keys this store reads and writes.
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Load the persisted session. Absent access token means no session.
    pub fn load(&self) -> Result<Option<Session>, StorageError> {
        let access_token = match self.store.get_string(&self.keys.access_token)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let refresh_token = self.store.get_string(&self.keys.refresh_token)?;
        let expires_at = match self.store.get_integer(&self.keys.expires_at)? {
            Some(secs) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                StorageError::CorruptedData {
                    key: self.keys.expires_at.clone(),
                    message: format!("expiry {} out of range", secs),
                }
            })?),
            None => None,
        };

        Session::new(access_token, refresh_token, expires_at)
            .map(Some)
            .map_err(|e| StorageError::CorruptedData {
                key: self.keys.access_token.clone(),
                message: e.to_string(),
            })
    }

    /// Persist `session`, replacing whatever was stored before.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.store
            .set_string(&self.keys.access_token, session.access_token())?;

        match (session.refresh_token(), session.expires_at()) {
            (Some(refresh_token), Some(expires_at)) => {
                let written = self
                    .store
                    .set_string(&self.keys.refresh_token, refresh_token)
                    .and_then(|_| {
                        self.store
                            .set_integer(&self.keys.expires_at, expires_at.timestamp())
                    });

                if let Err(e) = written {
                    // Leave neither half of the pair behind.
                    let _ = self.remove_pair();
                    return Err(e);
                }
                Ok(())
            }
            _ => self.remove_pair(),
        }
    }

    /// Remove every entry of the session.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in self.keys.all() {
            self.store.remove(key)?;
        }
        Ok(())
    }

    fn remove_pair(&self) -> Result<(), StorageError> {
        let refresh = self.store.remove(&self.keys.refresh_token);
        let expiry = self.store.remove(&self.keys.expires_at);
        refresh.and(expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemorySecureStore, MockSecureStore, StoreOperation, StoredValue};
    use chrono::{Duration, Utc};

    fn in_memory(prefix: &str) -> (Arc<InMemorySecureStore>, SessionStore<InMemorySecureStore>) {
        let store = Arc::new(InMemorySecureStore::new());
        (store.clone(), SessionStore::new(store, SessionKeys::new(prefix)))
    }

    fn full_session() -> Session {
        Session::new(
            "access",
            Some("refresh".to_string()),
            Some(Utc::now() + Duration::hours(1)),
        )
        .unwrap()
    }

    #[test]
    fn test_load_empty_store() {
        let (_, sessions) = in_memory("app");
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[test]
    fn test_round_trip_full_session() {
        let (_, sessions) = in_memory("app");
        let session = full_session();

        sessions.save(&session).unwrap();
        assert_eq!(sessions.load().unwrap(), Some(session));
    }

    #[test]
    fn test_round_trip_access_only_session() {
        let (_, sessions) = in_memory("app");
        let session = Session::new("access", None, None).unwrap();

        sessions.save(&session).unwrap();
        assert_eq!(sessions.load().unwrap(), Some(session));
    }

    #[test]
    fn test_round_trip_relative_expiry() {
        let (_, sessions) = in_memory("app");
        let session = Session::with_expires_in(
            "access",
            Some("refresh".to_string()),
            Some(3600),
            Utc::now(),
        )
        .unwrap();

        sessions.save(&session).unwrap();
        assert_eq!(sessions.load().unwrap(), Some(session));
    }

    #[test]
    fn test_refresh_token_without_expiry_is_not_persisted() {
        let (store, sessions) = in_memory("app");
        let session = Session::new("access", Some("refresh".to_string()), None).unwrap();

        sessions.save(&session).unwrap();

        let loaded = sessions.load().unwrap().unwrap();
        assert_eq!(loaded.access_token(), "access");
        assert!(loaded.refresh_token().is_none());
        assert!(store.value("app_refresh_token").is_none());
    }

    #[test]
    fn test_expiry_without_refresh_token_is_not_persisted() {
        let (store, sessions) = in_memory("app");
        let session = Session::new("access", None, Some(Utc::now() + Duration::hours(1))).unwrap();

        sessions.save(&session).unwrap();

        assert!(store.value("app_expires_at").is_none());
        assert!(sessions.load().unwrap().unwrap().expires_at().is_none());
    }

    #[test]
    fn test_save_replaces_stale_pair() {
        let (store, sessions) = in_memory("app");
        sessions.save(&full_session()).unwrap();

        sessions
            .save(&Session::new("second", None, None).unwrap())
            .unwrap();

        assert!(store.value("app_refresh_token").is_none());
        assert!(store.value("app_expires_at").is_none());
        assert_eq!(
            store.value("app_access_token"),
            Some(StoredValue::Text("second".to_string()))
        );
    }

    #[test]
    fn test_expiry_stored_as_integer_seconds() {
        let (store, sessions) = in_memory("app");
        let session = full_session();
        sessions.save(&session).unwrap();

        assert_eq!(
            store.value("app_expires_at"),
            Some(StoredValue::Integer(session.expires_at().unwrap().timestamp()))
        );
    }

    #[test]
    fn test_missing_expiry_loads_as_none_not_zero() {
        let store = Arc::new(MockSecureStore::new());
        store
            .with_string("app_access_token", "access")
            .with_string("app_refresh_token", "refresh");
        let sessions = SessionStore::new(store, SessionKeys::new("app"));

        let loaded = sessions.load().unwrap().unwrap();
        assert!(loaded.expires_at().is_none());
        assert!(!loaded.can_refresh());
    }

    #[test]
    fn test_distinct_prefixes_do_not_collide() {
        let store = Arc::new(InMemorySecureStore::new());
        let first = SessionStore::new(store.clone(), SessionKeys::new("first"));
        let second = SessionStore::new(store.clone(), SessionKeys::new("second"));

        first.save(&full_session()).unwrap();

        assert_eq!(second.load().unwrap(), None);
        assert_eq!(store.keys().len(), 3);
    }

    #[test]
    fn test_failed_pair_write_leaves_neither_half() {
        let store = Arc::new(MockSecureStore::new());
        store.fail_writes_to("app_expires_at");
        let sessions = SessionStore::new(store.clone(), SessionKeys::new("app"));

        let result = sessions.save(&full_session());

        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
        assert!(store.value("app_refresh_token").is_none());
        assert!(store.value("app_expires_at").is_none());
        assert!(store
            .get_history()
            .contains(&StoreOperation::Remove("app_refresh_token".to_string())));
    }

    #[test]
    fn test_corrupted_expiry_reported() {
        let store = Arc::new(MockSecureStore::new());
        store
            .with_string("app_access_token", "access")
            .with_string("app_expires_at", "tomorrow");
        let sessions = SessionStore::new(store, SessionKeys::new("app"));

        assert!(matches!(
            sessions.load(),
            Err(StorageError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_empty_stored_access_token_is_corruption() {
        let store = Arc::new(MockSecureStore::new());
        store.with_string("app_access_token", "");
        let sessions = SessionStore::new(store, SessionKeys::new("app"));

        assert!(matches!(
            sessions.load(),
            Err(StorageError::CorruptedData { .. })
        ));
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let (store, sessions) = in_memory("app");
        sessions.save(&full_session()).unwrap();

        sessions.clear().unwrap();

        assert!(store.keys().is_empty());
        assert_eq!(sessions.load().unwrap(), None);
    }
}
