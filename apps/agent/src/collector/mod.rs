// Device Snapshot Collector: battery, location and step count, bundled into a
// single point-in-time snapshot for the sync dispatcher.

pub mod battery;
pub mod location;
pub mod step_tracker;
pub mod steps;

use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, warn};

use crate::models::snapshot::DeviceSnapshot;

pub use battery::{BatterySource, FixedBattery, SysfsBattery};
pub use location::{LocationCollector, LocationPolicy, LocationProvider};
pub use steps::StepCounter;

#[derive(Clone)]
pub struct SnapshotCollector {
    battery: Arc<dyn BatterySource>,
    location: LocationCollector,
    /// `None` when no step tracker runs on this device.
    steps: Option<StepCounter>,
}

impl SnapshotCollector {
    pub fn new(
        battery: Arc<dyn BatterySource>,
        location: LocationCollector,
        steps: Option<StepCounter>,
    ) -> Self {
        Self {
            battery,
            location,
            steps,
        }
    }

    pub async fn collect(&self) -> DeviceSnapshot {
        let battery = self.battery.percent().unwrap_or_else(|| {
            warn!("Battery level unavailable, reporting 0");
            0
        });
        debug!("Battery: {battery}");

        let location = self.location.locate().await;
        debug!("GPS: lat={}, lon={}", location.lat, location.lon);

        let steps = self
            .steps
            .as_ref()
            .map(|counter| counter.today_steps(Local::now().date_naive()));

        DeviceSnapshot {
            battery,
            location,
            steps,
            captured_at: Utc::now(),
        }
    }
}
