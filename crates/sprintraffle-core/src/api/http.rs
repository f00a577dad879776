//! reqwest-backed [`RaffleApi`].
//!
//! Requests carry the stored bearer token. A 401 triggers one refresh through
//! `POST /auth/refresh` and one replay; if the refresh fails the stored
//! credentials are cleared. Nothing else is retried.

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use super::{RaffleApi, ServerTimeEvent};
use crate::ads::{Ad, AdViewRequest, AdViewResponse};
use crate::error::{ApiError, CoreError, Result};
use crate::ledger::TicketSnapshot;
use crate::sprint::Sprint;
use crate::storage::{Config, CredentialStore};

/// Stop reading the time stream after this many bytes without an event.
const TIME_STREAM_LIMIT: usize = 8 * 1024;

#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
}

#[derive(Debug)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    credentials: Option<Mutex<CredentialStore>>,
}

impl HttpApi {
    /// Client for `base_url` with credentials from `credentials`.
    pub fn new(base_url: &str, timeout: Duration, credentials: CredentialStore) -> Result<Self> {
        Self::build(base_url, timeout, Some(credentials))
    }

    /// Client that never sends a token and never refreshes.
    pub fn anonymous(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::build(base_url, timeout, None)
    }

    pub fn from_config(config: &Config, credentials: CredentialStore) -> Result<Self> {
        Self::new(&config.api.base_url, config.api_timeout(), credentials)
    }

    fn build(base_url: &str, timeout: Duration, credentials: Option<CredentialStore>) -> Result<Self> {
        // Url::join replaces the last segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            client,
            base_url,
            credentials: credentials.map(Mutex::new),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn with_credentials<T>(&self, f: impl FnOnce(&CredentialStore) -> Result<T>) -> Result<Option<T>> {
        let Some(store) = &self.credentials else {
            return Ok(None);
        };
        let store = store
            .lock()
            .map_err(|_| CoreError::Custom("credential store lock poisoned".into()))?;
        f(&store).map(Some)
    }

    fn stored_token(&self) -> Result<Option<String>> {
        Ok(self.with_credentials(|s| s.auth_token())?.flatten())
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        tracing::debug!(%method, path = url.path(), status = response.status().as_u16(), "api response");
        Ok(response)
    }

    /// Send a request, refreshing the token once on 401.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let url = self.endpoint(path)?;
        let token = self.stored_token()?;
        let response = self
            .dispatch(method.clone(), url.clone(), body, token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED || self.credentials.is_none() {
            return Ok(response);
        }

        let Some(refresh_token) = self.with_credentials(|s| s.refresh_token())?.flatten() else {
            tracing::info!(path, "request unauthorized and no refresh token stored");
            return Err(ApiError::Unauthorized.into());
        };
        let token = match self.refresh(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, clearing credentials");
                self.with_credentials(|s| s.clear_auth())?;
                return Err(ApiError::Unauthorized.into());
            }
        };

        let retry = self.dispatch(method, url, body, Some(&token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }
        Ok(retry)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let url = self.endpoint("auth/refresh")?;
        let body = json!({ "refreshToken": refresh_token });
        let response = self.dispatch(Method::POST, url, Some(&body), None).await?;
        let refreshed: RefreshResponse = decode(response).await?;
        self.with_credentials(|s| s.set_auth_token(&refreshed.token))?;
        tracing::info!("auth token refreshed");
        Ok(refreshed.token)
    }

    /// GET an endpoint whose "nothing here" answer is 204 or a JSON `null`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = error_for_status(self.send(Method::GET, path, None).await?).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Malformed(format!("{path}: {e}")).into())
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], keeping the server's
/// `message` field when the body has one.
async fn error_for_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_owned));
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = error_for_status(response).await?;
    let bytes = response.bytes().await.map_err(ApiError::from)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()).into())
}

/// First `data:` payload in a server-sent-events buffer, if complete.
fn first_data_line(buffer: &str) -> Option<&str> {
    buffer
        .split_inclusive('\n')
        .filter(|line| line.ends_with('\n'))
        .find_map(|line| line.trim_end().strip_prefix("data:"))
        .map(str::trim)
}

impl RaffleApi for HttpApi {
    async fn current_sprint(&self) -> Result<Option<Sprint>> {
        self.get_optional("sprint/current").await
    }

    async fn next_sprint(&self) -> Result<Option<Sprint>> {
        self.get_optional("sprint/next").await
    }

    async fn my_tickets(&self) -> Result<TicketSnapshot> {
        decode(self.send(Method::GET, "raffle/my-tickets", None).await?).await
    }

    async fn record_ad_view(&self, request: &AdViewRequest) -> Result<AdViewResponse> {
        let body = serde_json::to_value(request)?;
        tracing::debug!(request_id = %request.request_id, ad_id = %request.ad_id, "recording ad view");
        decode(self.send(Method::POST, "ads/view", Some(&body)).await?).await
    }

    async fn active_ads(&self, sprint_id: &str) -> Result<Vec<Ad>> {
        let path = format!("ads/sprint/{sprint_id}");
        decode(self.send(Method::GET, &path, None).await?).await
    }

    /// Reads the time stream until its first event, then drops the connection.
    async fn server_time(&self) -> Result<DateTime<Utc>> {
        let mut response = error_for_status(self.send(Method::GET, "time/stream", None).await?).await?;
        let mut buffer = String::new();
        while let Some(chunk) = response.chunk().await.map_err(ApiError::from)? {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            if let Some(data) = first_data_line(&buffer) {
                let event: ServerTimeEvent = serde_json::from_str(data)
                    .map_err(|e| ApiError::Malformed(format!("time stream: {e}")))?;
                return Ok(event.instant()?);
            }
            if buffer.len() > TIME_STREAM_LIMIT {
                break;
            }
        }
        Err(ApiError::Malformed("time stream ended without an event".into()).into())
    }
}
