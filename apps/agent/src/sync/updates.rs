use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::api_client::ApiClient;
use crate::errors::AgentError;
use crate::models::daily::DailyUpdate;
use crate::models::snapshot::UpdatePayload;
use crate::store::CredentialStore;
use crate::sync::access_token;
use crate::sync::partner::encode_image_data_url;

pub const MAX_MOOD_LEN: usize = 50;

/// Trims and checks a mood before it is sent.
pub fn validate_mood(mood: &str) -> Result<&str, AgentError> {
    let mood = mood.trim();
    if mood.is_empty() {
        return Err(AgentError::Validation("Please enter your mood".to_string()));
    }
    if mood.chars().count() > MAX_MOOD_LEN {
        return Err(AgentError::Validation("Mood text is too long".to_string()));
    }
    Ok(mood)
}

/// User-initiated partial updates (mood, shared photo) and the daily history.
#[derive(Clone)]
pub struct UpdateService {
    api: ApiClient,
    credentials: CredentialStore,
}

impl UpdateService {
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        Self { api, credentials }
    }

    pub async fn post_mood(&self, mood: &str) -> Result<(), AgentError> {
        let mood = validate_mood(mood)?;
        let token = access_token(&self.credentials)?;
        self.api.post_update(&token, &UpdatePayload::mood(mood)).await?;
        info!("Mood updated");
        Ok(())
    }

    pub async fn share_image(&self, jpeg: &[u8]) -> Result<(), AgentError> {
        if jpeg.is_empty() {
            return Err(AgentError::Image("empty image".to_string()));
        }
        let token = access_token(&self.credentials)?;
        let payload = UpdatePayload::shared_image(encode_image_data_url(jpeg));
        self.api.post_update(&token, &payload).await?;
        info!("Image uploaded ({} bytes)", jpeg.len());
        Ok(())
    }

    pub async fn share_image_file(&self, path: &Path) -> Result<(), AgentError> {
        let bytes = tokio::fs::read(path).await?;
        self.share_image(&bytes).await
    }

    pub async fn daily_updates(&self, date: NaiveDate) -> Result<Vec<DailyUpdate>, AgentError> {
        let token = access_token(&self.credentials)?;
        Ok(self.api.daily_updates(&token, date).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    use crate::store::PreferenceStore;

    fn service(server: &MockServer) -> (tempfile::TempDir, UpdateService) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")).unwrap());
        let credentials = CredentialStore::new(prefs);
        credentials.save("tok", "ref").unwrap();
        let api = ApiClient::new(&server.url("/api"), Duration::from_secs(2), Duration::from_secs(5))
            .unwrap();
        (dir, UpdateService::new(api, credentials))
    }

    #[test]
    fn test_validate_mood() {
        assert_eq!(validate_mood("  Happy ").unwrap(), "Happy");
        assert!(validate_mood("   ").is_err());
        assert!(validate_mood(&"x".repeat(51)).is_err());
        assert!(validate_mood(&"x".repeat(50)).is_ok());
    }

    #[tokio::test]
    async fn test_post_mood_sends_trimmed_mood() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .json_body(json!({"mood": "Tired"}));
                then.status(200);
            })
            .await;

        let (_dir, service) = service(&server);
        service.post_mood(" Tired ").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_mood_is_not_sent() {
        let server = MockServer::start_async().await;
        let (_dir, service) = service(&server);
        let err = service.post_mood("").await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_share_image_sends_data_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .json_body(json!({"shared_image": "data:image/jpeg;base64,/9j/"}));
                then.status(200);
            })
            .await;

        let (_dir, service) = service(&server);
        service.share_image(&[0xff, 0xd8, 0xff]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_daily_updates_failure_surfaces() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/userdata/daily-updates/");
                then.status(500);
            })
            .await;

        let (_dir, service) = service(&server);
        let date = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        assert!(service.daily_updates(date).await.is_err());
    }
}
