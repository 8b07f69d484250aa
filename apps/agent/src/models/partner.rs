//! Partner snapshot as returned by `GET /userdata/partner-data/`.
//!
//! Decoding is lenient by construction: the body is walked once as a
//! `serde_json::Value` and each field becomes `Some` only if it is present and
//! has a usable shape. Nothing here can fail; a body that is not a JSON
//! object simply yields an all-unknown snapshot.

use serde_json::{Map, Value};

use crate::models::snapshot::GeoPoint;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerSnapshot {
    pub battery: Option<u8>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub mood: Option<String>,
    pub steps: Option<u64>,
    pub updated_at: Option<String>,
    /// The caller's own mood as last stored by the backend.
    pub self_mood: Option<String>,
    /// `data:image/jpeg;base64,...` URL of the photo the partner shared.
    pub shared_image: Option<String>,
}

impl PartnerSnapshot {
    pub fn from_json(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            battery: number(obj, "battery")
                .filter(|b| (0.0..=100.0).contains(b))
                .map(|b| b.round() as u8),
            gps_lat: number(obj, "gps_lat").filter(|lat| (-90.0..=90.0).contains(lat)),
            gps_lon: number(obj, "gps_lon").filter(|lon| (-180.0..=180.0).contains(lon)),
            mood: text(obj, "mood"),
            steps: number(obj, "steps")
                .filter(|s| *s >= 0.0)
                .map(|s| s as u64),
            updated_at: text(obj, "updated_at"),
            self_mood: text(obj, "self_mood"),
            shared_image: text(obj, "shared_image"),
        }
    }

    /// Both coordinates, or `None` if either is unknown.
    pub fn location(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.gps_lat?, self.gps_lon?))
    }
}

/// Numbers may arrive as JSON numbers or as numeric strings
/// (Django `DecimalField` serializes to a string).
fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
