use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::store::prefs::{PreferenceStore, StoreError};

pub const KEY_BASE: &str = "base_steps";
pub const KEY_LATEST: &str = "latest_steps";
pub const KEY_DAY: &str = "day_key";

/// `yyyyMMdd`
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Daily step total derived from a cumulative (since-boot) sensor value.
///
/// The sensor only ever reports a running total, so the counter remembers the
/// cumulative value seen at the start of the day (`base_steps`) and stores
/// `cumulative - base` as today's total. Written only by the step tracker.
#[derive(Clone)]
pub struct StepCounter {
    prefs: Arc<PreferenceStore>,
}

impl StepCounter {
    pub fn new(prefs: Arc<PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Records a cumulative reading taken on `today` and returns today's total.
    pub fn record(&self, cumulative: u64, today: NaiveDate) -> Result<u32, StoreError> {
        let today_key = day_key(today);
        let saved_day = self.prefs.get_string(KEY_DAY);

        let base = if saved_day.as_deref() != Some(today_key.as_str()) {
            debug!("New day, reset base={cumulative}");
            cumulative
        } else {
            self.prefs.get_u64(KEY_BASE).unwrap_or(cumulative)
        };

        // A sensor reset (reboot) makes cumulative drop below base.
        let steps = u32::try_from(cumulative.saturating_sub(base)).unwrap_or(u32::MAX);

        self.prefs.set_many(vec![
            (KEY_DAY, Value::from(today_key)),
            (KEY_BASE, Value::from(base)),
            (KEY_LATEST, Value::from(steps)),
        ])?;

        debug!("cumulative={cumulative} base={base} today={steps}");
        Ok(steps)
    }

    /// Today's total, or 0 if nothing has been recorded today.
    pub fn today_steps(&self, today: NaiveDate) -> u32 {
        if self.prefs.get_string(KEY_DAY).as_deref() != Some(day_key(today).as_str()) {
            return 0;
        }
        self.prefs
            .get_u64(KEY_LATEST)
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(0)
    }
}
