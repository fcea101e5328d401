//! Session persistence across two storage scopes.
//!
//! The durable scope survives restarts; the tab scope lives only as long as
//! the surrounding session (browser tab, terminal). A [`SessionStore`] reads
//! the durable scope first and the tab scope second, and writes a new session
//! into exactly one of them.

mod file;
mod memory;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Session, UserProfile};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key holding the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key holding the JSON-serialized user profile.
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Lifetime of a storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Persists across runs ("remember me").
    Durable,
    /// Cleared when the enclosing tab or terminal session ends.
    Tab,
}

impl Scope {
    /// Scope written for a given "remember me" choice.
    pub fn for_remember_me(remember: bool) -> Self {
        if remember { Scope::Durable } else { Scope::Tab }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Scope::Durable => Scope::Tab,
            Scope::Tab => Scope::Durable,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Durable => f.write_str("durable"),
            Scope::Tab => f.write_str("tab"),
        }
    }
}

/// String key-value storage area. Each call is atomic on its own.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key in this area.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Dual-scope view over the session keys.
#[derive(Clone)]
pub struct SessionStore {
    durable: Arc<dyn KeyValueStore>,
    tab: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, tab: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, tab }
    }

    /// Both scopes held in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Raw access to one scope.
    pub fn scope(&self, scope: Scope) -> &dyn KeyValueStore {
        match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Tab => self.tab.as_ref(),
        }
    }

    /// First non-empty value for `key`, durable scope first.
    fn lookup(&self, key: &str) -> Result<Option<(Scope, String)>, StorageError> {
        for scope in [Scope::Durable, Scope::Tab] {
            if let Some(value) = self.scope(scope).get(key)?
                && !value.is_empty()
            {
                return Ok(Some((scope, value)));
            }
        }
        Ok(None)
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.lookup(ACCESS_TOKEN_KEY)?.map(|(_, v)| v))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.lookup(REFRESH_TOKEN_KEY)?.map(|(_, v)| v))
    }

    /// Admission check for protected views: a non-empty access token in either scope.
    pub fn is_authenticated(&self) -> Result<bool, StorageError> {
        Ok(self.access_token()?.is_some())
    }

    /// Scope currently holding the session, if any.
    pub fn active_scope(&self) -> Result<Option<Scope>, StorageError> {
        if let Some((scope, _)) = self.lookup(ACCESS_TOKEN_KEY)? {
            return Ok(Some(scope));
        }
        Ok(self.lookup(REFRESH_TOKEN_KEY)?.map(|(scope, _)| scope))
    }

    /// Cached user of the active session.
    pub fn user(&self) -> Result<Option<UserProfile>, StorageError> {
        let Some(scope) = self.active_scope()? else {
            return Ok(None);
        };
        match self.scope(scope).get(USER_KEY)? {
            Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    /// Full session from the active scope, if every part is present.
    pub fn load(&self) -> Result<Option<Session>, StorageError> {
        let Some(scope) = self.active_scope()? else {
            return Ok(None);
        };
        let area = self.scope(scope);
        let (Some(access_token), Some(refresh_token), Some(user)) = (
            area.get(ACCESS_TOKEN_KEY)?,
            area.get(REFRESH_TOKEN_KEY)?,
            area.get(USER_KEY)?,
        ) else {
            return Ok(None);
        };
        Ok(Some(Session {
            access_token,
            refresh_token,
            user: serde_json::from_str(&user)?,
        }))
    }

    /// Write a freshly issued session into the scope picked by `remember`,
    /// removing the session keys from the other scope.
    pub fn persist(&self, session: &Session, remember: bool) -> Result<Scope, StorageError> {
        let target = Scope::for_remember_me(remember);
        let other = self.scope(target.opposite());
        for key in SESSION_KEYS {
            other.remove(key)?;
        }
        let area = self.scope(target);
        area.set(ACCESS_TOKEN_KEY, &session.access_token)?;
        area.set(REFRESH_TOKEN_KEY, &session.refresh_token)?;
        area.set(USER_KEY, &serde_json::to_string(&session.user)?)?;
        info!(scope = %target, user_id = session.user.id, "session stored");
        Ok(target)
    }

    /// Overwrite the token pair after a refresh, in the scope holding the session.
    /// Nothing is written once both scopes have been cleared.
    pub fn rotate_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        let Some(scope) = self.active_scope()? else {
            warn!("session cleared before token rotation, tokens not stored");
            return Ok(());
        };
        let area = self.scope(scope);
        area.set(ACCESS_TOKEN_KEY, access)?;
        if let Some(refresh) = refresh {
            area.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        debug!(scope = %scope, rotated_refresh = refresh.is_some(), "tokens rotated");
        Ok(())
    }

    /// Replace the cached user of the active session.
    pub fn update_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        if let Some(scope) = self.active_scope()? {
            self.scope(scope)
                .set(USER_KEY, &serde_json::to_string(user)?)?;
        }
        Ok(())
    }

    /// Wipe both scopes entirely.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.durable.clear()?;
        self.tab.clear()?;
        info!("session storage cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(access: &str) -> Session {
        Session {
            access_token: access.into(),
            refresh_token: format!("{access}-refresh"),
            user: UserProfile {
                id: 1,
                username: "jdoe".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn remember_me_writes_durable_scope_only() {
        let store = SessionStore::in_memory();
        let scope = store.persist(&session("a1"), true).unwrap();

        assert_eq!(scope, Scope::Durable);
        assert_eq!(
            store.scope(Scope::Durable).get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
            Some("a1")
        );
        for key in SESSION_KEYS {
            assert!(store.scope(Scope::Tab).get(key).unwrap().is_none());
        }
    }

    #[test]
    fn forget_me_writes_tab_scope_only() {
        let store = SessionStore::in_memory();
        store.persist(&session("a1"), false).unwrap();

        assert!(store.scope(Scope::Durable).get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(store.active_scope().unwrap(), Some(Scope::Tab));
    }

    #[test]
    fn persisting_clears_opposite_scope() {
        let store = SessionStore::in_memory();
        store.persist(&session("old"), true).unwrap();
        store.persist(&session("new"), false).unwrap();

        for key in SESSION_KEYS {
            assert!(store.scope(Scope::Durable).get(key).unwrap().is_none());
        }
        assert_eq!(store.load().unwrap(), Some(session("new")));
    }

    #[test]
    fn durable_scope_is_checked_first() {
        let store = SessionStore::in_memory();
        store.scope(Scope::Tab).set(ACCESS_TOKEN_KEY, "tab").unwrap();
        store.scope(Scope::Durable).set(ACCESS_TOKEN_KEY, "durable").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("durable"));

        store.scope(Scope::Durable).set(ACCESS_TOKEN_KEY, "").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("tab"));
    }

    #[test]
    fn rotation_stays_in_active_scope() {
        let store = SessionStore::in_memory();
        store.persist(&session("a1"), false).unwrap();
        store.rotate_tokens("a2", None).unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("a1-refresh"));
        assert!(store.scope(Scope::Durable).get(ACCESS_TOKEN_KEY).unwrap().is_none());

        store.rotate_tokens("a3", Some("r3")).unwrap();
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r3"));
    }

    #[test]
    fn rotation_after_logout_writes_nothing() {
        let store = SessionStore::in_memory();
        store.persist(&session("a1"), true).unwrap();
        store.clear_all().unwrap();

        store.rotate_tokens("a2", Some("r2")).unwrap();

        assert!(store.active_scope().unwrap().is_none());
        for scope in [Scope::Durable, Scope::Tab] {
            assert!(store.scope(scope).get(ACCESS_TOKEN_KEY).unwrap().is_none());
            assert!(store.scope(scope).get(REFRESH_TOKEN_KEY).unwrap().is_none());
        }
    }

    #[test]
    fn clear_all_logs_out() {
        let store = SessionStore::in_memory();
        store.persist(&session("a1"), true).unwrap();
        store.scope(Scope::Tab).set("other", "x").unwrap();
        store.clear_all().unwrap();

        assert!(!store.is_authenticated().unwrap());
        assert!(store.user().unwrap().is_none());
        assert!(store.scope(Scope::Tab).get("other").unwrap().is_none());
    }

    #[test]
    fn user_update_is_visible_on_load() {
        let store = SessionStore::in_memory();
        store.persist(&session("a1"), true).unwrap();
        let mut user = store.user().unwrap().unwrap();
        user.photo_url = Some("/media/p.jpg".into());
        store.update_user(&user).unwrap();

        assert_eq!(
            store.load().unwrap().unwrap().user.photo_url.as_deref(),
            Some("/media/p.jpg")
        );
    }
}
