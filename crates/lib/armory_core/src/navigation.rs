//! Navigation capability injected into the session client and the auth flows.

use std::sync::{Mutex, PoisonError};

/// Login view.
pub const LOGIN: &str = "/login";
/// Home (profile) view.
pub const HOME: &str = "/home";

/// Moves the user to another view.
///
/// Implementations route through the host's own router; the client never
/// forces a page reload.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);
}

/// Navigator that only records the requested paths.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every path requested so far, oldest first.
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visits().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, path: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
