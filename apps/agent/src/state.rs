use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::collector::location::{FileLocationProvider, NoLocation};
use crate::collector::{
    LocationCollector, LocationPolicy, LocationProvider, SnapshotCollector, StepCounter,
    SysfsBattery,
};
use crate::config::Config;
use crate::jobs::{DeviceSyncJob, PartnerRefreshJob};
use crate::scheduler::{AlwaysOnline, Connectivity, HostReachability, RetryPolicy, Scheduler};
use crate::store::{CredentialStore, PreferenceStore};
use crate::sync::{AccountService, PartnerFetcher, PartnerSink, SyncDispatcher, UpdateService};

/// Everything the agent shares between its jobs and user-facing operations.
/// Built once at startup; the API client is cloned into each service rather
/// than held globally.
#[derive(Clone)]
pub struct AgentState {
    pub config: Config,
    pub prefs: Arc<PreferenceStore>,
    pub credentials: CredentialStore,
    pub api: ApiClient,
    /// `Some` only when a step source is configured.
    pub steps: Option<StepCounter>,
    pub collector: SnapshotCollector,
    pub scheduler: Arc<Scheduler>,
    pub cancel: CancellationToken,
}

impl AgentState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let prefs = Arc::new(
            PreferenceStore::open(&config.state_path).with_context(|| {
                format!("Failed to open preference store {}", config.state_path.display())
            })?,
        );
        let credentials = CredentialStore::new(prefs.clone());

        let api = ApiClient::new(&config.api_base, config.connect_timeout, config.request_timeout)
            .context("Failed to build HTTP client")?;
        info!("API client initialized (base: {})", api.base_url());

        let steps = config
            .step_source
            .as_ref()
            .map(|_| StepCounter::new(prefs.clone()));

        let location_provider: Arc<dyn LocationProvider> = match &config.location_file {
            Some(path) => {
                info!("Location fixes from {}", path.display());
                Arc::new(FileLocationProvider::new(path))
            }
            None => Arc::new(NoLocation),
        };
        let policy = LocationPolicy {
            permission_granted: config.location_permission,
            max_age: config.location_max_age,
            timeout: config.location_timeout,
        };
        let collector = SnapshotCollector::new(
            Arc::new(SysfsBattery::new()),
            LocationCollector::new(location_provider, policy),
            steps.clone(),
        );

        let connectivity: Arc<dyn Connectivity> =
            match HostReachability::for_base_url(&config.api_base, config.connect_timeout) {
                Some(reachability) => Arc::new(reachability),
                None => {
                    warn!("No host in {}; skipping connectivity checks", config.api_base);
                    Arc::new(AlwaysOnline)
                }
            };
        let retry = RetryPolicy {
            initial_delay: config.retry_initial_delay,
            max_delay: config.sync_interval,
            max_attempts: config.retry_max_attempts,
            ..RetryPolicy::default()
        };
        let cancel = CancellationToken::new();
        let scheduler = Arc::new(Scheduler::new(connectivity, retry, cancel.clone()));

        Ok(Self {
            config: config.clone(),
            prefs,
            credentials,
            api,
            steps,
            collector,
            scheduler,
            cancel,
        })
    }

    pub fn account(&self) -> AccountService {
        AccountService::new(self.api.clone(), self.credentials.clone())
    }

    pub fn updates(&self) -> UpdateService {
        UpdateService::new(self.api.clone(), self.credentials.clone())
    }

    pub fn partner_fetcher(&self) -> PartnerFetcher {
        PartnerFetcher::new(self.api.clone(), self.credentials.clone())
    }

    pub fn device_sync_job(&self) -> Arc<DeviceSyncJob> {
        let dispatcher = SyncDispatcher::new(self.api.clone(), self.credentials.clone());
        Arc::new(DeviceSyncJob::new(self.collector.clone(), dispatcher))
    }

    pub fn partner_refresh_job(&self, sink: Arc<dyn PartnerSink>) -> Arc<PartnerRefreshJob> {
        Arc::new(PartnerRefreshJob::new(self.partner_fetcher(), sink))
    }

    /// Registers both periodic jobs. Safe to call again: names that are still
    /// scheduled keep their existing task.
    pub fn register_jobs(&self, sink: Arc<dyn PartnerSink>) {
        let interval = self.config.sync_interval;
        self.scheduler
            .register_periodic(self.partner_refresh_job(sink), interval);
        self.scheduler
            .register_periodic(self.device_sync_job(), interval);
    }
}
