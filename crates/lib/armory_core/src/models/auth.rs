//! Authentication models.

use serde::{Deserialize, Serialize};

/// Login form input. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /api/auth/login/qr/`.
#[derive(Debug, Clone, Serialize)]
pub struct QrLoginRequest {
    pub id_code: String,
}

/// Body of `POST /api/register/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    pub rank: String,
    pub unit: String,
    pub phone_number: String,
    pub birth_date: String,
    pub role: String,
    pub id_code: String,
}

/// Body of `POST /api/token/refresh/`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response of `POST /api/token/refresh/`. The refresh token is only present when rotated.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Personnel record as served by `GET /api/users/{id}/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, alias = "service_number")]
    pub id_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// Name shown in headers: full name when known, username otherwise.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Authenticated session returned by login, QR login and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Response of `POST /api/users/upload-photo/`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUploadResponse {
    pub photo_url: String,
}
