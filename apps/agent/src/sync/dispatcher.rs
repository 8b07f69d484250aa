use tracing::{debug, error, info, warn};

use crate::api_client::{ApiClient, ApiError};
use crate::models::snapshot::{DeviceSnapshot, UpdatePayload};
use crate::store::CredentialStore;
use crate::sync::{access_token, SyncOutcome};

/// Pushes device snapshots (and other partial updates) to `/userdata/update/`.
#[derive(Clone)]
pub struct SyncDispatcher {
    api: ApiClient,
    credentials: CredentialStore,
}

impl SyncDispatcher {
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        Self { api, credentials }
    }

    pub async fn dispatch(&self, snapshot: &DeviceSnapshot) -> SyncOutcome {
        let payload = UpdatePayload::from(snapshot);
        if let Ok(json) = serde_json::to_string(&payload) {
            debug!("JSON => {json}");
        }

        match self.push(&payload).await {
            Ok(()) => {
                info!("Device snapshot synced (battery={}%)", snapshot.battery);
                SyncOutcome::Success
            }
            Err(ApiError::MissingCredential) => {
                error!("No token found");
                SyncOutcome::retry(ApiError::MissingCredential)
            }
            Err(e) => {
                warn!("POST failed: {e}");
                SyncOutcome::retry(e)
            }
        }
    }

    /// One authenticated POST of an arbitrary partial update.
    pub async fn push(&self, payload: &UpdatePayload) -> Result<(), ApiError> {
        let token = access_token(&self.credentials)?;
        self.api.post_update(&token, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::models::snapshot::GeoPoint;
    use crate::store::PreferenceStore;

    fn dispatcher(server: &MockServer, token: Option<&str>) -> (tempfile::TempDir, SyncDispatcher) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")).unwrap());
        let credentials = CredentialStore::new(prefs);
        if let Some(token) = token {
            credentials.save(token, "refresh").unwrap();
        }
        let api = ApiClient::new(&server.url("/api"), Duration::from_secs(2), Duration::from_secs(5))
            .unwrap();
        (dir, SyncDispatcher::new(api, credentials))
    }

    fn snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            battery: 80,
            location: GeoPoint::new(12.9, 77.6),
            steps: None,
            captured_at: Utc::now(),
        }
    }

    async fn mock_update(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .header("authorization", "Bearer valid-token")
                    .json_body(json!({"battery": 80, "gps_lat": 12.9, "gps_lon": 77.6}));
                then.status(200).json_body(json!({"status": "updated"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .header("authorization", "Bearer expired-token");
                then.status(401)
                    .json_body(json!({"detail": "Given token not valid for any token type"}));
            })
            .await;
    }

    #[tokio::test]
    async fn test_valid_token_succeeds() {
        let server = MockServer::start_async().await;
        mock_update(&server).await;
        let (_dir, dispatcher) = dispatcher(&server, Some("valid-token"));

        assert_eq!(dispatcher.dispatch(&snapshot()).await, SyncOutcome::Success);
    }

    #[tokio::test]
    async fn test_invalid_token_is_retryable() {
        let server = MockServer::start_async().await;
        mock_update(&server).await;
        let (_dir, dispatcher) = dispatcher(&server, Some("expired-token"));

        let outcome = dispatcher.dispatch(&snapshot()).await;
        assert!(matches!(outcome, SyncOutcome::Retry { .. }));
    }

    #[tokio::test]
    async fn test_missing_token_is_retryable_without_request() {
        let server = MockServer::start_async().await;
        // Would accept anything; a retry proves the request never went out.
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/userdata/update/");
                then.status(200);
            })
            .await;
        let (_dir, dispatcher) = dispatcher(&server, None);

        let outcome = dispatcher.dispatch(&snapshot()).await;
        assert_eq!(outcome, SyncOutcome::retry(ApiError::MissingCredential));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")).unwrap());
        let credentials = CredentialStore::new(prefs);
        credentials.save("valid-token", "refresh").unwrap();
        // Port 9 (discard) is closed on test hosts; the connect fails fast.
        let api = ApiClient::new(
            "http://127.0.0.1:9/api",
            Duration::from_millis(500),
            Duration::from_secs(1),
        )
        .unwrap();

        let outcome = SyncDispatcher::new(api, credentials).dispatch(&snapshot()).await;
        assert!(matches!(outcome, SyncOutcome::Retry { .. }));
    }
}
