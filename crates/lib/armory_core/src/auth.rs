//! Login, registration, logout and profile calls.
//!
//! Each successful authentication writes the returned session into the
//! storage scope picked by the "remember me" flag and navigates onward.

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{RequestBody, SessionClient};
use crate::error::{ClientError, ClientResult, FieldErrors, ScanFlowError};
use crate::models::{
    Credential, PhotoUploadResponse, QrLoginRequest, RegisterRequest, Session, UserProfile,
};
use crate::navigation::{self, Navigator};
use crate::scan::{Decoder, ScanController, ScanOutcome};
use crate::storage::{SessionStore, StorageError};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const QR_LOGIN_PATH: &str = "/api/auth/login/qr/";
pub const REGISTER_PATH: &str = "/api/register/";
pub const UPLOAD_PHOTO_PATH: &str = "/api/users/upload-photo/";

/// Profile endpoint for one user.
pub fn user_path(id: i64) -> String {
    format!("/api/users/{id}/")
}

/// Fresh identification code for a personnel QR badge.
pub fn generate_id_code() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Registration form as filled in by the user.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub details: RegisterRequest,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Check the form locally and produce the request body.
    pub fn validate(&self) -> Result<&RegisterRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.details.username.trim().is_empty() {
            errors.add("username", "Username is required");
        }
        if self.details.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.details.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }
        if self.details.id_code.trim().is_empty() {
            errors.add("id_code", "Please generate your QR code first.");
        }
        if errors.is_empty() {
            Ok(&self.details)
        } else {
            Err(errors)
        }
    }
}

fn establish(
    client: &SessionClient,
    session: Session,
    remember: bool,
    next: &str,
) -> ClientResult<Session> {
    let scope = client.sessions().persist(&session, remember)?;
    info!(user_id = session.user.id, %scope, "logged in");
    client.navigator().go_to(next);
    Ok(session)
}

/// Password login.
pub async fn login(
    client: &SessionClient,
    credential: &Credential,
    remember: bool,
) -> ClientResult<Session> {
    let mut errors = FieldErrors::new();
    if credential.username.trim().is_empty() {
        errors.add("username", "Username is required");
    }
    if credential.password.is_empty() {
        errors.add("password", "Password is required");
    }
    if !errors.is_empty() {
        return Err(ClientError::Validation(errors));
    }

    let session: Session = client.post_public(LOGIN_PATH, credential).await?;
    establish(client, session, remember, navigation::HOME)
}

/// Login with the identification code read from a personnel QR badge.
pub async fn login_with_id_code(
    client: &SessionClient,
    id_code: &str,
    remember: bool,
) -> ClientResult<Session> {
    let id_code = id_code.trim();
    if id_code.is_empty() {
        return Err(ClientError::Validation(FieldErrors::single(
            "id_code",
            "The scanned QR code is empty",
        )));
    }
    let session: Session = client
        .post_public(
            QR_LOGIN_PATH,
            &QrLoginRequest {
                id_code: id_code.to_string(),
            },
        )
        .await?;
    establish(client, session, remember, navigation::HOME)
}

/// Scan a badge and log in with it.
///
/// When the backend rejects the code nothing is stored and the scanner is
/// back in `Idle`, ready for another attempt.
pub async fn scan_and_login<D: Decoder>(
    client: &SessionClient,
    scanner: &mut ScanController<D>,
    teardown: &CancellationToken,
    remember: bool,
) -> Result<Session, ScanFlowError> {
    let id_code = match scanner.run(teardown).await {
        ScanOutcome::Decoded(text) => text,
        ScanOutcome::Failed(e) => return Err(e.into()),
        ScanOutcome::Cancelled => return Err(ScanFlowError::Cancelled),
    };
    match login_with_id_code(client, &id_code, remember).await {
        Ok(session) => Ok(session),
        Err(e) => {
            scanner.reset();
            Err(e.into())
        }
    }
}

/// Create an account. The returned session is stored, then the user is sent to the login view.
pub async fn register(
    client: &SessionClient,
    form: &RegistrationForm,
    remember: bool,
) -> ClientResult<Session> {
    let request = form.validate().map_err(ClientError::Validation)?;
    let session: Session = client.post_public(REGISTER_PATH, request).await?;
    establish(client, session, remember, navigation::LOGIN)
}

/// Forget the session in both scopes and return to the login view.
pub fn logout(client: &SessionClient) -> ClientResult<()> {
    info!("logging out");
    client.end_session()
}

/// Fetch one user's profile.
pub async fn fetch_profile(client: &SessionClient, id: i64) -> ClientResult<UserProfile> {
    client.get(&user_path(id)).await
}

/// Re-fetch the signed-in user's profile and refresh the cached copy.
pub async fn load_profile(client: &SessionClient) -> ClientResult<UserProfile> {
    let Some(cached) = client.sessions().user()? else {
        client.end_session()?;
        return Err(ClientError::Unauthenticated("no user in session".into()));
    };
    let profile = fetch_profile(client, cached.id).await?;
    client.sessions().update_user(&profile)?;
    Ok(profile)
}

/// Upload a profile photo and record its URL on the cached user.
pub async fn upload_photo(
    client: &SessionClient,
    file_name: &str,
    bytes: Vec<u8>,
    mime: &str,
) -> ClientResult<PhotoUploadResponse> {
    let body = RequestBody::Photo {
        file_name: file_name.to_string(),
        bytes,
        mime: mime.to_string(),
    };
    let uploaded: PhotoUploadResponse = client
        .request(Method::POST, UPLOAD_PHOTO_PATH, body)
        .await?;
    if let Some(mut user) = client.sessions().user()? {
        user.photo_url = Some(uploaded.photo_url.clone());
        client.sessions().update_user(&user)?;
    }
    Ok(uploaded)
}

/// Admission check for protected views. Redirects to login when it fails.
pub fn admit(sessions: &SessionStore, navigator: &dyn Navigator) -> Result<bool, StorageError> {
    let admitted = sessions.is_authenticated()?;
    if !admitted {
        navigator.go_to(navigation::LOGIN);
    }
    Ok(admitted)
}

/// Cached view of who is signed in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    user: Option<UserProfile>,
    authenticated: bool,
}

impl AuthState {
    pub fn load(sessions: &SessionStore) -> Result<Self, StorageError> {
        Ok(Self {
            user: sessions.user()?,
            authenticated: sessions.is_authenticated()?,
        })
    }

    /// Storage changed elsewhere (another tab or process): replace, never merge.
    pub fn on_storage_changed(&mut self, sessions: &SessionStore) -> Result<(), StorageError> {
        *self = Self::load(sessions)?;
        Ok(())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
