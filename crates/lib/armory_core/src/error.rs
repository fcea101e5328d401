//! Client error types.
//!
//! Every failure path of the session client and the services built on it
//! resolves to a [`ClientError`] that the calling view can render.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::scan::ScanError;
use crate::storage::StorageError;

/// Convenience alias for client call results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Field-level validation messages keyed by form field name.
///
/// The `non_field_errors` key holds messages that apply to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shorthand.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for one field.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Parse a `{ "field": ["message", ...] }` body as returned by the backend on 400.
    ///
    /// Returns `None` unless every value is a string or an array of strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.is_empty() {
            return None;
        }
        let mut errors = Self::new();
        for (field, messages) in object {
            match messages {
                serde_json::Value::String(m) => errors.add(field, m.clone()),
                serde_json::Value::Array(items) => {
                    for item in items {
                        errors.add(field, item.as_str()?.to_string());
                    }
                }
                _ => return None,
            }
        }
        Some(errors)
    }
}

impl fmt::Display for FieldErrors {
    /// Summary banner text: `field: message; field: message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                if field == Self::NON_FIELD {
                    write!(f, "{message}")?;
                } else {
                    write!(f, "{field}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

/// Errors surfaced to callers of the session client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable session. Storage has been cleared and the login redirect issued.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Whether the caller must send the user back to the login view.
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::Unauthenticated(_))
    }

    /// Short user-facing message suitable for an inline banner.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthenticated(_) => "Your session has expired. Please log in again.".into(),
            ClientError::Validation(errors) => errors.to_string(),
            ClientError::Backend { message, .. } => message.clone(),
            ClientError::ServiceUnavailable(_) | ClientError::Network(_) => {
                "The service is unavailable. Please try again later.".into()
            }
            other => other.to_string(),
        }
    }
}

/// Failure of a scan-then-call flow (QR login, scan-driven withdraw/return).
#[derive(Debug, Error)]
pub enum ScanFlowError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Scan cancelled")]
    Cancelled,

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}
