use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Placeholder reported whenever no real location is available.
    pub const SENTINEL: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_sentinel(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    /// `geo:` URI understood by map applications.
    pub fn map_uri(&self) -> String {
        format!("geo:{lat},{lon}?q={lat},{lon}", lat = self.lat, lon = self.lon)
    }
}

/// Point-in-time device telemetry. Built fresh for every sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub battery: u8,
    pub location: GeoPoint,
    /// `None` when step tracking is not running on this device.
    pub steps: Option<u32>,
    pub captured_at: DateTime<Utc>,
}

/// JSON body of `POST /userdata/update/`. The endpoint accepts partial
/// updates, so every field is optional and absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_image: Option<String>,
}

impl UpdatePayload {
    pub fn mood(mood: impl Into<String>) -> Self {
        Self {
            mood: Some(mood.into()),
            ..Self::default()
        }
    }

    pub fn shared_image(data_url: impl Into<String>) -> Self {
        Self {
            shared_image: Some(data_url.into()),
            ..Self::default()
        }
    }
}

impl From<&DeviceSnapshot> for UpdatePayload {
    fn from(snapshot: &DeviceSnapshot) -> Self {
        Self {
            battery: Some(snapshot.battery),
            gps_lat: Some(snapshot.location.lat),
            gps_lon: Some(snapshot.location.lon),
            steps: snapshot.steps,
            ..Self::default()
        }
    }
}
