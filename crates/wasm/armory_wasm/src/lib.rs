//! Browser bindings: session storage backed by `localStorage` (durable scope)
//! and `sessionStorage` (tab scope).

use std::sync::Arc;

use armory_core::navigation;
use armory_core::storage::{KeyValueStore, Scope, SessionStore, StorageError};
use wasm_bindgen::prelude::*;

/// One of the browser's Web Storage areas.
///
/// The `Storage` handle is looked up on every call, so the store itself
/// holds no JS object.
#[derive(Debug, Clone, Copy)]
pub struct BrowserStorage {
    scope: Scope,
}

impl BrowserStorage {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    fn area(&self) -> Result<web_sys::Storage, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        let area = match self.scope {
            Scope::Durable => window.local_storage(),
            Scope::Tab => window.session_storage(),
        };
        area.map_err(js_error)?
            .ok_or_else(|| StorageError::Unavailable(format!("{} storage disabled", self.scope)))
    }
}

fn js_error(e: JsValue) -> StorageError {
    StorageError::Unavailable(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.area()?.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.area()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.area()?.remove_item(key).map_err(js_error)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.area()?.clear().map_err(js_error)
    }
}

/// Session store over `localStorage` and `sessionStorage`.
pub fn browser_sessions() -> SessionStore {
    SessionStore::new(
        Arc::new(BrowserStorage::new(Scope::Durable)),
        Arc::new(BrowserStorage::new(Scope::Tab)),
    )
}

fn to_js(e: StorageError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Returns the version of the armory_wasm package.
#[wasm_bindgen]
pub fn version() -> String {
    armory_core::version().to_string()
}

/// Whether a non-empty access token is stored in either scope.
#[wasm_bindgen(js_name = isAuthenticated)]
pub fn is_authenticated() -> Result<bool, JsValue> {
    browser_sessions().is_authenticated().map_err(to_js)
}

/// `"durable"`, `"tab"` or `undefined` when signed out.
#[wasm_bindgen(js_name = activeScope)]
pub fn active_scope() -> Result<Option<String>, JsValue> {
    Ok(browser_sessions()
        .active_scope()
        .map_err(to_js)?
        .map(|scope| scope.to_string()))
}

/// Cached user profile as JSON, or `undefined` when signed out.
#[wasm_bindgen(js_name = currentUser)]
pub fn current_user() -> Result<Option<String>, JsValue> {
    let Some(user) = browser_sessions().user().map_err(to_js)? else {
        return Ok(None);
    };
    serde_json::to_string(&user)
        .map(Some)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Clear both scopes and return the route the host router should show next.
#[wasm_bindgen]
pub fn logout() -> Result<String, JsValue> {
    browser_sessions().clear_all().map_err(to_js)?;
    Ok(navigation::LOGIN.to_string())
}
