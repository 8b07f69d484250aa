/// API Client: the single point of entry for all TwinSync backend calls.
///
/// No other module builds HTTP requests. One `ApiClient` is constructed at
/// startup and handed to every component; clones share the same connection
/// pool.
///
/// The client does not retry. Retrying is the scheduler's job, so a call here
/// is exactly one request bounded by the configured connect/total timeouts.
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::auth::{
    AcceptInviteRequest, AuthResponse, InviteResponse, LoginRequest, LogoutRequest,
    RegisterRequest, TokenPair,
};
use crate::models::daily::{DailyUpdate, DailyUpdatesRequest};
use crate::models::partner::PartnerSnapshot;
use crate::models::snapshot::UpdatePayload;

pub mod endpoints;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No access token stored")]
    MissingCredential,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The backend refused the access token (401/403).
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }

    /// A client-error response: the backend answered, and the answer was
    /// "no" (no partner linked, bad invite code). Token rejection, timeouts
    /// and rate limiting are excluded.
    pub fn is_unpaired(&self) -> bool {
        matches!(
            self,
            ApiError::Status { status, .. }
                if (400..500).contains(status) && !matches!(*status, 401 | 403 | 408 | 429)
        )
    }
}

/// DRF-style error body: `{"detail": "..."}` or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct BackendError {
    detail: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("twinsync-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Auth ────────────────────────────────────────────────────────────────

    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, ApiError> {
        let body = RegisterRequest {
            display_name,
            email,
            password,
        };
        let request = self.client.post(self.url(endpoints::REGISTER)).json(&body);
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.tokens)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let body = LoginRequest { email, password };
        let request = self.client.post(self.url(endpoints::LOGIN)).json(&body);
        let response: AuthResponse = self.send_json(request).await?;
        Ok(response.tokens)
    }

    /// Invalidates `refresh` server-side. The access token is attached when
    /// available; the backend only needs the refresh token in the body.
    pub async fn logout(&self, access: Option<&str>, refresh: &str) -> Result<(), ApiError> {
        let mut request = self
            .client
            .post(self.url(endpoints::LOGOUT))
            .json(&LogoutRequest { refresh });
        if let Some(token) = access {
            request = request.bearer_auth(token);
        }
        self.send(request).await?;
        Ok(())
    }

    // ── Pairing ─────────────────────────────────────────────────────────────

    pub async fn create_invitation(&self, token: &str) -> Result<String, ApiError> {
        let request = self.authorized_get(token, endpoints::CREATE_INVITATION);
        let response: InviteResponse = self.send_json(request).await?;
        Ok(response.invite_code)
    }

    pub async fn accept_invitation(&self, token: &str, invite_code: &str) -> Result<(), ApiError> {
        let request =
            self.authorized_post(token, endpoints::ACCEPT_INVITATION, &AcceptInviteRequest { invite_code });
        self.send(request).await?;
        Ok(())
    }

    pub async fn unlink(&self, token: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(endpoints::UNLINK))
            .bearer_auth(token)
            .header("accept", "application/json");
        self.send(request).await?;
        Ok(())
    }

    // ── User data ───────────────────────────────────────────────────────────

    pub async fn post_update(&self, token: &str, payload: &UpdatePayload) -> Result<(), ApiError> {
        let request = self.authorized_post(token, endpoints::USERDATA_UPDATE, payload);
        let response = self.send(request).await?;
        let text = response.text().await.unwrap_or_default();
        debug!("Update accepted: {text}");
        Ok(())
    }

    /// Fetches the partner snapshot. Only the transport and the status code
    /// can fail this call; the body itself is decoded leniently.
    pub async fn partner_data(&self, token: &str) -> Result<PartnerSnapshot, ApiError> {
        let request = self.authorized_get(token, endpoints::PARTNER_DATA);
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(PartnerSnapshot::from_json(&body))
    }

    pub async fn daily_updates(
        &self,
        token: &str,
        date: NaiveDate,
    ) -> Result<Vec<DailyUpdate>, ApiError> {
        let request = self.authorized_post(
            token,
            endpoints::DAILY_UPDATES,
            &DailyUpdatesRequest::for_date(date),
        );
        self.send_json(request).await
    }

    // ── Plumbing ────────────────────────────────────────────────────────────

    fn authorized_get(&self, token: &str, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .header("accept", "application/json")
    }

    fn authorized_post<T: Serialize + ?Sized>(
        &self,
        token: &str,
        path: &str,
        body: &T,
    ) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .header("accept", "application/json")
            .json(body)
    }

    /// Sends the request and maps any non-2xx status to `ApiError::Status`,
    /// preferring the backend's own error message over the raw body.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BackendError>(&body)
            .ok()
            .and_then(|e| e.detail.or(e.error))
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    body
                }
            });

        debug!("Backend returned {status}: {message}");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(ApiError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(
            &server.url("/api"),
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_unpaired_classification() {
        let not_found = ApiError::Status {
            status: 404,
            message: "No partner".into(),
        };
        let rate_limited = ApiError::Status {
            status: 429,
            message: "slow down".into(),
        };
        let server_error = ApiError::Status {
            status: 503,
            message: "down".into(),
        };
        assert!(not_found.is_unpaired());
        assert!(!rate_limited.is_unpaired());
        assert!(!server_error.is_unpaired());
        assert!(!ApiError::MissingCredential.is_unpaired());
    }

    #[test]
    fn test_rejected_token_is_not_unpaired() {
        for status in [401, 403] {
            let err = ApiError::Status {
                status,
                message: "Given token not valid for any token type".into(),
            };
            assert!(err.is_auth_rejected());
            assert!(!err.is_unpaired());
        }
        let not_found = ApiError::Status {
            status: 404,
            message: "No partner".into(),
        };
        assert!(!not_found.is_auth_rejected());
    }

    #[tokio::test]
    async fn test_login_returns_tokens() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login/")
                    .json_body(json!({"email": "a@b.c", "password": "pw"}));
                then.status(200)
                    .json_body(json!({"tokens": {"access": "acc", "refresh": "ref"}}));
            })
            .await;

        let tokens = client_for(&server).login("a@b.c", "pw").await.unwrap();
        mock.assert_async().await;
        assert_eq!(tokens.access, "acc");
        assert_eq!(tokens.refresh, "ref");
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/invitation/accept-invitation/");
                then.status(400).json_body(json!({"detail": "Invalid invite code"}));
            })
            .await;

        let err = client_for(&server)
            .accept_invitation("tok", "ZZZ")
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid invite code");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_sends_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .header("authorization", "Bearer tok")
                    .json_body(json!({"mood": "Happy"}));
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;

        client_for(&server)
            .post_update("tok", &UpdatePayload::mood("Happy"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_partner_data_with_partial_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/userdata/partner-data/");
                then.status(200).json_body(json!({"mood": "Calm"}));
            })
            .await;

        let snapshot = client_for(&server).partner_data("tok").await.unwrap();
        assert_eq!(snapshot.mood.as_deref(), Some("Calm"));
        assert_eq!(snapshot.battery, None);
    }

    #[tokio::test]
    async fn test_daily_updates_posts_date() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/daily-updates/")
                    .json_body(json!({"date": "2025-01-31"}));
                then.status(200).json_body(json!([
                    {"battery": 40, "gps_lat": null, "gps_lon": null, "mood": "ok",
                     "note": "", "logged_at": "2025-01-31T08:00:00Z"}
                ]));
            })
            .await;

        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let updates = client_for(&server).daily_updates("tok", date).await.unwrap();
        mock.assert_async().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].battery, Some(40));
    }

    #[tokio::test]
    async fn test_unlink_uses_delete() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/invitation/unlink/");
                then.status(204);
            })
            .await;

        client_for(&server).unlink("tok").await.unwrap();
        mock.assert_async().await;
    }
}
