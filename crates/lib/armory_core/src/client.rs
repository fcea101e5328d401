//! Authenticated HTTP client with one-shot token refresh.
//!
//! Every protected call carries `Authorization: Bearer <access_token>`. When
//! the backend answers 401 the client exchanges the refresh token once,
//! stores the rotated pair and replays the original request. If no refresh
//! token exists or the exchange fails, both storage scopes are cleared and
//! the navigator is sent to the login view.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, FieldErrors};
use crate::models::{RefreshRequest, RefreshResponse};
use crate::navigation::{self, Navigator};
use crate::storage::SessionStore;

/// Token refresh endpoint.
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Body of an outgoing request.
///
/// Bodies are kept in a re-buildable form so a request can be replayed
/// after a token refresh.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Multipart upload with a single `photo` part.
    Photo {
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> ClientResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ClientError::Decode(format!("request encode: {e}")))
    }
}

/// Session-aware HTTP client.
#[derive(Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    sessions: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    pub fn new(
        config: &ClientConfig,
        sessions: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("armory/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
            timeout: config.request_timeout,
            sessions,
            navigator,
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        body: &RequestBody,
        token: Option<&str>,
    ) -> ClientResult<RequestBuilder> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Photo {
                file_name,
                bytes,
                mime,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|_| {
                        ClientError::Validation(FieldErrors::single(
                            "photo",
                            format!("Unsupported file type '{mime}'"),
                        ))
                    })?;
                request.multipart(Form::new().part("photo", part))
            }
        })
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: &RequestBody,
        token: Option<&str>,
    ) -> ClientResult<Response> {
        debug!(%method, path, authenticated = token.is_some(), "sending request");
        self.build(method.clone(), path, body, token)?
            .send()
            .await
            .map_err(|e| {
                warn!(%method, path, error = %e, "request failed without response");
                ClientError::Network(e.to_string())
            })
    }

    /// Perform an authenticated request, refreshing the access token at most once.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ClientResult<T> {
        let mut token = self.sessions.access_token()?;
        let mut retried = false;
        loop {
            let response = self.send(&method, path, &body, token.as_deref()).await?;
            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                let original = error_from_response(response).await;
                token = Some(self.refresh(original).await?);
                continue;
            }
            return read_json(response).await;
        }
    }

    /// Authenticated `GET`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request(Method::GET, path, RequestBody::Empty).await
    }

    /// Authenticated JSON `POST`.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.request(Method::POST, path, RequestBody::json(body)?)
            .await
    }

    /// Unauthenticated JSON `POST` (login, registration, token refresh).
    ///
    /// No bearer token is attached and a 401 is reported as-is.
    pub async fn post_public<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = RequestBody::json(body)?;
        let response = self.send(&Method::POST, path, &body, None).await?;
        read_json(response).await
    }

    /// Obtain a new access token after `original` failed with 401.
    async fn refresh(&self, original: ClientError) -> ClientResult<String> {
        let Some(refresh_token) = self.sessions.refresh_token()? else {
            warn!("access token rejected and no refresh token stored");
            self.expire();
            return Err(ClientError::Unauthenticated(original.to_string()));
        };

        let exchanged: ClientResult<RefreshResponse> = self
            .post_public(
                REFRESH_PATH,
                &RefreshRequest {
                    refresh: refresh_token,
                },
            )
            .await;

        match exchanged {
            Ok(tokens) => {
                self.sessions
                    .rotate_tokens(&tokens.access, tokens.refresh.as_deref())?;
                info!("access token refreshed");
                Ok(tokens.access)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                self.expire();
                Err(ClientError::Unauthenticated(original.to_string()))
            }
        }
    }

    /// Drop every stored credential and send the user to the login view.
    pub fn end_session(&self) -> ClientResult<()> {
        let cleared = self.sessions.clear_all();
        self.navigator.go_to(navigation::LOGIN);
        cleared.map_err(ClientError::from)
    }

    /// End the session after a failed refresh. The caller still reports
    /// `Unauthenticated` when the stores cannot be cleared.
    fn expire(&self) {
        if let Err(e) = self.end_session() {
            warn!(error = %e, "stored credentials could not be cleared");
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let bytes = response.bytes().await?;
    let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error_from_parts(status, &text)
}

/// Map a failed response to a [`ClientError`].
///
/// Message lookup order: `error`, `detail`, `message` fields, then a field
/// map (400 only), then the raw body, then a generic status message.
pub(crate) fn error_from_parts(status: StatusCode, text: &str) -> ClientError {
    let json = serde_json::from_str::<serde_json::Value>(text).ok();
    let message = json.as_ref().and_then(|value| {
        ["error", "detail", "message"]
            .iter()
            .find_map(|key| value.get(key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    if status == StatusCode::BAD_REQUEST
        && message.is_none()
        && let Some(fields) = json.as_ref().and_then(FieldErrors::from_json)
    {
        return ClientError::Validation(fields);
    }

    let trimmed = text.trim();
    let message = message
        .or_else(|| {
            (json.is_none() && !trimmed.is_empty() && !trimmed.starts_with('<'))
                .then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ClientError::ServiceUnavailable(message)
        }
        _ => ClientError::Backend {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_wins() {
        let err = error_from_parts(StatusCode::NOT_FOUND, r#"{"error": "Invalid ID code"}"#);
        assert!(matches!(
            err,
            ClientError::Backend { status: 404, ref message } if message == "Invalid ID code"
        ));
    }

    #[test]
    fn detail_field_is_used() {
        let err = error_from_parts(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Given token not valid for any token type"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Backend error (401): Given token not valid for any token type"
        );
    }

    #[test]
    fn bad_request_field_map_is_validation() {
        let err = error_from_parts(
            StatusCode::BAD_REQUEST,
            r#"{"username": ["This field is required."]}"#,
        );
        let ClientError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(fields.get("username"), ["This field is required.".to_string()]);
    }

    #[test]
    fn unavailable_statuses() {
        let err = error_from_parts(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(err, ClientError::ServiceUnavailable(ref m) if m == "Request failed with status 503"));
    }

    #[test]
    fn html_bodies_are_not_echoed() {
        let err = error_from_parts(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>");
        assert!(matches!(
            err,
            ClientError::Backend { status: 500, ref message } if message == "Request failed with status 500"
        ));
        let err = error_from_parts(StatusCode::FORBIDDEN, "Forbidden");
        assert!(matches!(err, ClientError::Backend { ref message, .. } if message == "Forbidden"));
    }
}
