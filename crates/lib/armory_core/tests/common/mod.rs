//! In-process fake of the Armory backend for client tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use armory_core::SessionClient;
use armory_core::config::ClientConfig;
use armory_core::models::{Session, UserProfile};
use armory_core::navigation::RecordingNavigator;
use armory_core::storage::SessionStore;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub const USERNAME: &str = "jdoe";
pub const PASSWORD: &str = "pass123";
pub const KNOWN_ID_CODE: &str = "ID-KNOWN";

/// Backend state observable from tests.
pub struct Backend {
    pub valid_access: Mutex<String>,
    pub valid_refresh: Mutex<String>,
    pub rotate_refresh: AtomicBool,
    pub always_unauthorized: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub protected_calls: AtomicUsize,
    pub public_calls: AtomicUsize,
    pub seen_auth: Mutex<Vec<Option<String>>>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            valid_access: Mutex::new("access-1".into()),
            valid_refresh: Mutex::new("refresh-1".into()),
            rotate_refresh: AtomicBool::new(false),
            always_unauthorized: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            protected_calls: AtomicUsize::new(0),
            public_calls: AtomicUsize::new(0),
            seen_auth: Mutex::new(Vec::new()),
        }
    }
}

impl Backend {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn protected_calls(&self) -> usize {
        self.protected_calls.load(Ordering::SeqCst)
    }

    pub fn public_calls(&self) -> usize {
        self.public_calls.load(Ordering::SeqCst)
    }

    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }

    /// Record a protected call and check its bearer token.
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.protected_calls.fetch_add(1, Ordering::SeqCst);
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen_auth.lock().unwrap().push(auth.clone());

        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        if self.always_unauthorized.load(Ordering::SeqCst) || auth.as_deref() != Some(&expected) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Given token not valid for any token type"})),
            )
                .into_response());
        }
        Ok(())
    }
}

pub fn user() -> UserProfile {
    UserProfile {
        id: 42,
        username: USERNAME.into(),
        full_name: Some("John Doe".into()),
        rank: Some("Sergeant".into()),
        unit: Some("3rd Logistics".into()),
        id_code: Some(KNOWN_ID_CODE.into()),
        ..Default::default()
    }
}

pub fn session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.into(),
        refresh_token: refresh.into(),
        user: user(),
    }
}

fn session_body() -> Value {
    serde_json::to_value(session("access-1", "refresh-1")).unwrap()
}

async fn login(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.public_calls.fetch_add(1, Ordering::SeqCst);
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Json(session_body()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn login_qr(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.public_calls.fetch_add(1, Ordering::SeqCst);
    if body["id_code"] == KNOWN_ID_CODE {
        Json(session_body()).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "Invalid ID code"}))).into_response()
    }
}

async fn register(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.public_calls.fetch_add(1, Ordering::SeqCst);
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }
    Json(session_body()).into_response()
}

async fn refresh(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let valid = b.valid_refresh.lock().unwrap().clone();
    if body["refresh"] != valid.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        )
            .into_response();
    }
    *b.valid_access.lock().unwrap() = "access-2".into();
    if b.rotate_refresh.load(Ordering::SeqCst) {
        *b.valid_refresh.lock().unwrap() = "refresh-2".into();
        Json(json!({"access": "access-2", "refresh": "refresh-2"})).into_response()
    } else {
        Json(json!({"access": "access-2"})).into_response()
    }
}

async fn inventory(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(denied) = b.authorize(&headers) {
        return denied;
    }
    Json(json!([
        {"id": 1, "name": "M4 Carbine", "type": "Weapons", "serial_number": "W-001",
         "status": "available", "qr_string": "QR-1"},
        {"id": 2, "name": "PRC-152 Radio", "type": "Comms", "serial_number": "C-002",
         "status": "in_use", "qr_string": "QR-2"}
    ]))
    .into_response()
}

async fn logs(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(denied) = b.authorize(&headers) {
        return denied;
    }
    Json(json!([
        {"id": 1, "item_id": 2, "item": "PRC-152 Radio", "action": "withdraw",
         "user": "jdoe", "timestamp": "2024-05-01T08:30:00Z"}
    ]))
    .into_response()
}

async fn profile(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = b.authorize(&headers) {
        return denied;
    }
    if id != 42 {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    }
    let mut user = user();
    user.email = Some("jdoe@unit.example".into());
    Json(user).into_response()
}

async fn upload_photo(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if let Err(denied) = b.authorize(&headers) {
        return denied;
    }
    let multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !multipart {
        return (StatusCode::BAD_REQUEST, Json(json!({"photo": ["No file was submitted."]})))
            .into_response();
    }
    Json(json!({"photo_url": "/media/photos/42.jpg"})).into_response()
}

async fn item_action(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = b.authorize(&headers) {
        return denied;
    }
    if body["item_id"] == "QR-1" {
        Json(json!({"message": "Item processed"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "Item not found"}))).into_response()
    }
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))).into_response()
}

async fn maintenance() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance").into_response()
}

pub fn router(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/login/qr/", post(login_qr))
        .route("/api/register/", post(register))
        .route("/api/token/refresh/", post(refresh))
        .route("/api/inventory/", get(inventory))
        .route("/api/inventory/withdraw", post(item_action))
        .route("/api/inventory/return", post(item_action))
        .route("/api/logs/", get(logs))
        .route("/api/users/{id}/", get(profile))
        .route("/api/users/upload-photo/", post(upload_photo))
        .route("/api/broken/", get(broken))
        .route("/api/maintenance/", get(maintenance))
        .with_state(backend)
}

/// Serve the fake backend on an ephemeral port and return its base URL.
pub async fn spawn(backend: Arc<Backend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(backend)).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct Harness {
    pub backend: Arc<Backend>,
    pub client: SessionClient,
    pub sessions: SessionStore,
    pub nav: Arc<RecordingNavigator>,
}

pub fn client_for(base_url: &str, sessions: SessionStore, nav: Arc<RecordingNavigator>) -> SessionClient {
    let config = ClientConfig::new(base_url, std::env::temp_dir()).unwrap();
    SessionClient::new(&config, sessions, nav).unwrap()
}

pub async fn harness() -> Harness {
    let backend = Arc::new(Backend::default());
    let base_url = spawn(backend.clone()).await;
    let sessions = SessionStore::in_memory();
    let nav = Arc::new(RecordingNavigator::new());
    let client = client_for(&base_url, sessions.clone(), nav.clone());
    Harness {
        backend,
        client,
        sessions,
        nav,
    }
}
