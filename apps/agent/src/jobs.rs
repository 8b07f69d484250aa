// The two periodic background jobs: push this device's snapshot, and refresh
// the partner view.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::collector::SnapshotCollector;
use crate::scheduler::Job;
use crate::sync::partner::view_for;
use crate::sync::{PartnerFetcher, PartnerSink, PartnerStatus, SyncDispatcher, SyncOutcome};

pub const DEVICE_SYNC_JOB: &str = "device-data-sync";
pub const PARTNER_REFRESH_JOB: &str = "partner-refresh";

/// Collect a snapshot, then dispatch it.
pub struct DeviceSyncJob {
    collector: SnapshotCollector,
    dispatcher: SyncDispatcher,
}

impl DeviceSyncJob {
    pub fn new(collector: SnapshotCollector, dispatcher: SyncDispatcher) -> Self {
        Self {
            collector,
            dispatcher,
        }
    }
}

#[async_trait]
impl Job for DeviceSyncJob {
    fn name(&self) -> &str {
        DEVICE_SYNC_JOB
    }

    async fn run(&self) -> SyncOutcome {
        let snapshot = self.collector.collect().await;
        self.dispatcher.dispatch(&snapshot).await
    }
}

/// Fetch partner data and hand the resulting view to the sink.
pub struct PartnerRefreshJob {
    fetcher: PartnerFetcher,
    sink: Arc<dyn PartnerSink>,
}

impl PartnerRefreshJob {
    pub fn new(fetcher: PartnerFetcher, sink: Arc<dyn PartnerSink>) -> Self {
        Self { fetcher, sink }
    }
}

#[async_trait]
impl Job for PartnerRefreshJob {
    fn name(&self) -> &str {
        PARTNER_REFRESH_JOB
    }

    async fn run(&self) -> SyncOutcome {
        let status = self.fetcher.fetch().await;

        match view_for(&status) {
            Some(view) => self.sink.render(&view),
            None => debug!("Keeping previous partner view"),
        }

        match status {
            PartnerStatus::Paired(_) | PartnerStatus::Unpaired => SyncOutcome::Success,
            PartnerStatus::SignedOut => SyncOutcome::retry("not logged in"),
            PartnerStatus::Rejected(reason) => SyncOutcome::retry(reason),
            PartnerStatus::Unreachable(reason) => SyncOutcome::retry(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;
    use tokio::sync::watch;

    use crate::api_client::ApiClient;
    use crate::collector::location::NoLocation;
    use crate::collector::{FixedBattery, LocationCollector, LocationPolicy};
    use crate::store::{CredentialStore, PreferenceStore};
    use crate::sync::PartnerView;

    fn credentials(dir: &tempfile::TempDir, token: Option<&str>) -> CredentialStore {
        let prefs = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")).unwrap());
        let credentials = CredentialStore::new(prefs);
        if let Some(token) = token {
            credentials.save(token, "refresh").unwrap();
        }
        credentials
    }

    fn api(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_millis(500), Duration::from_secs(2)).unwrap()
    }

    fn partner_job(
        base: &str,
        credentials: CredentialStore,
    ) -> (PartnerRefreshJob, watch::Receiver<PartnerView>) {
        let (tx, rx) = watch::channel(PartnerView::Loading);
        let job = PartnerRefreshJob::new(PartnerFetcher::new(api(base), credentials), Arc::new(tx));
        (job, rx)
    }

    #[tokio::test]
    async fn test_device_sync_posts_collected_snapshot() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/userdata/update/")
                    .header("authorization", "Bearer tok")
                    .json_body(json!({"battery": 42, "gps_lat": 0.0, "gps_lon": 0.0}));
                then.status(200);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let credentials = credentials(&dir, Some("tok"));
        let collector = SnapshotCollector::new(
            Arc::new(FixedBattery(42)),
            LocationCollector::new(Arc::new(NoLocation), LocationPolicy::default()),
            None,
        );
        let job = DeviceSyncJob::new(
            collector,
            SyncDispatcher::new(api(&server.url("/api")), credentials),
        );

        assert_eq!(job.name(), DEVICE_SYNC_JOB);
        assert_eq!(job.run().await, SyncOutcome::Success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_partner_refresh_renders_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/userdata/partner-data/");
                then.status(200)
                    .json_body(json!({"battery": 55, "mood": "Calm", "steps": 1200}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (job, rx) = partner_job(&server.url("/api"), credentials(&dir, Some("tok")));

        assert_eq!(job.run().await, SyncOutcome::Success);
        let view = rx.borrow().clone();
        match view {
            PartnerView::Partner(summary) => {
                assert_eq!(summary.battery, Some(55));
                assert_eq!(summary.mood, "Calm");
                assert_eq!(summary.steps, 1200);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partner_refresh_unpaired_shows_invite() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/userdata/partner-data/");
                then.status(404).json_body(json!({"error": "No partner linked"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (job, rx) = partner_job(&server.url("/api"), credentials(&dir, Some("tok")));

        assert_eq!(job.run().await, SyncOutcome::Success);
        assert_eq!(*rx.borrow(), PartnerView::Invite);
    }

    #[tokio::test]
    async fn test_partner_refresh_rejected_token_is_retried() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/userdata/partner-data/");
                then.status(401)
                    .json_body(json!({"detail": "Given token not valid for any token type"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (job, rx) = partner_job(&server.url("/api"), credentials(&dir, Some("expired")));

        assert!(matches!(job.run().await, SyncOutcome::Retry { .. }));
        assert_eq!(*rx.borrow(), PartnerView::SignedOut);
    }

    #[tokio::test]
    async fn test_partner_refresh_unreachable_keeps_view() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/userdata/partner-data/");
                then.status(503);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (job, rx) = partner_job(&server.url("/api"), credentials(&dir, Some("tok")));

        assert!(matches!(job.run().await, SyncOutcome::Retry { .. }));
        assert_eq!(*rx.borrow(), PartnerView::Loading);
    }

    #[tokio::test]
    async fn test_partner_refresh_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let (job, rx) = partner_job("http://127.0.0.1:9/api", credentials(&dir, None));

        assert!(matches!(job.run().await, SyncOutcome::Retry { .. }));
        assert_eq!(*rx.borrow(), PartnerView::SignedOut);
    }
}
