use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::steps::StepCounter;

/// Source of cumulative step readings. `None` means the sensor is gone.
#[async_trait]
pub trait StepSensor: Send {
    async fn next_reading(&mut self) -> Option<u64>;
}

/// Readings pushed by an embedding process.
pub struct ChannelStepSensor {
    rx: mpsc::Receiver<u64>,
}

impl ChannelStepSensor {
    pub fn new(rx: mpsc::Receiver<u64>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl StepSensor for ChannelStepSensor {
    async fn next_reading(&mut self) -> Option<u64> {
        self.rx.recv().await
    }
}

/// Polls a file holding the cumulative count (e.g. exported by a pedometer
/// daemon) and yields each new value.
pub struct FileStepSensor {
    path: PathBuf,
    poll_interval: Duration,
    last: Option<u64>,
}

impl FileStepSensor {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            last: None,
        }
    }
}

#[async_trait]
impl StepSensor for FileStepSensor {
    async fn next_reading(&mut self) -> Option<u64> {
        loop {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(raw) => match raw.trim().parse::<u64>() {
                    Ok(value) if Some(value) != self.last => {
                        self.last = Some(value);
                        return Some(value);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Ignoring step reading {:?}: {e}", raw.trim()),
                },
                Err(e) => debug!("Step source {} unreadable: {e}", self.path.display()),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Feeds sensor readings into the counter until the sensor closes or the
/// token is cancelled. The tracker is the counter's only writer.
pub async fn run_step_tracker<S: StepSensor>(
    mut sensor: S,
    counter: StepCounter,
    cancel: CancellationToken,
) {
    info!("Step tracker started");
    loop {
        let reading = tokio::select! {
            _ = cancel.cancelled() => break,
            reading = sensor.next_reading() => reading,
        };

        let Some(cumulative) = reading else {
            warn!("Step sensor closed");
            break;
        };

        let today = Local::now().date_naive();
        if let Err(e) = counter.record(cumulative, today) {
            warn!("Failed to persist step count: {e}");
        }
    }
    info!("Step tracker stopped");
}
