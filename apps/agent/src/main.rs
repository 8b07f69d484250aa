use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use twinsync_agent::collector::step_tracker::{run_step_tracker, FileStepSensor};
use twinsync_agent::config::Config;
use twinsync_agent::state::AgentState;
use twinsync_agent::sync::partner::LogSink;
use twinsync_agent::sync::PartnerSink;

const STEP_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; only malformed values fail here
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TwinSync agent v{}", env!("CARGO_PKG_VERSION"));

    let state = AgentState::from_config(&config)?;
    if !state.account().is_logged_in() {
        warn!("No stored credentials; background syncs will retry until a login happens");
    }

    // Step tracker runs for the agent's lifetime when a sensor source is set
    let tracker = match (&config.step_source, &state.steps) {
        (Some(source), Some(counter)) => {
            info!("Step tracker reading {}", source.display());
            let sensor = FileStepSensor::new(source, STEP_POLL_INTERVAL);
            Some(tokio::spawn(run_step_tracker(
                sensor,
                counter.clone(),
                state.cancel.child_token(),
            )))
        }
        _ => None,
    };

    // Register both periodic jobs (boot registration)
    let sink: Arc<dyn PartnerSink> = Arc::new(LogSink);
    state.register_jobs(sink.clone());
    info!(
        "Background sync every {}s against {}",
        config.sync_interval.as_secs(),
        state.api.base_url()
    );

    wait_for_shutdown(&state, sink).await?;

    info!("Shutting down");
    state.scheduler.shutdown().await;
    if let Some(tracker) = tracker {
        tracker.await.ok();
    }

    Ok(())
}

/// Blocks until Ctrl-C. On unix, SIGUSR1 triggers an immediate run of both
/// jobs ("sync now").
#[cfg(unix)]
async fn wait_for_shutdown(state: &AgentState, sink: Arc<dyn PartnerSink>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sync_now = signal(SignalKind::user_defined1())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => return Ok(result?),
            _ = sync_now.recv() => {
                info!("Sync requested");
                state.scheduler.run_now(state.partner_refresh_job(sink.clone()));
                state.scheduler.run_now(state.device_sync_job());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_state: &AgentState, _sink: Arc<dyn PartnerSink>) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
