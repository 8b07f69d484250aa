use std::path::PathBuf;

use tracing::debug;

/// Synchronous battery reading, 0..=100. `None` when the host has no battery.
pub trait BatterySource: Send + Sync {
    fn percent(&self) -> Option<u8>;
}

/// Reads the Linux power-supply class: the first supply whose `type` is
/// `Battery` and that exposes a readable `capacity`.
pub struct SysfsBattery {
    root: PathBuf,
}

impl SysfsBattery {
    pub fn new() -> Self {
        Self::with_root("/sys/class/power_supply")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl BatterySource for SysfsBattery {
    fn percent(&self) -> Option<u8> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {e}", self.root.display());
                return None;
            }
        };

        let mut supplies: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        supplies.sort();

        supplies.iter().find_map(|supply| {
            let kind = std::fs::read_to_string(supply.join("type")).ok()?;
            if kind.trim() != "Battery" {
                return None;
            }
            let capacity = std::fs::read_to_string(supply.join("capacity")).ok()?;
            let value = capacity.trim().parse::<i64>().ok()?;
            Some(value.clamp(0, 100) as u8)
        })
    }
}

/// Constant reading, for hosts without a battery.
pub struct FixedBattery(pub u8);

impl BatterySource for FixedBattery {
    fn percent(&self) -> Option<u8> {
        Some(self.0.min(100))
    }
}
