use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry of the partner's history for a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUpdate {
    #[serde(default)]
    pub battery: Option<i64>,
    #[serde(default)]
    pub gps_lat: Option<f64>,
    #[serde(default)]
    pub gps_lon: Option<f64>,
    #[serde(default)]
    pub mood: Option<String>,
    pub note: String,
    pub logged_at: String,
}

#[derive(Debug, Serialize)]
pub struct DailyUpdatesRequest {
    /// yyyy-MM-dd
    pub date: String,
}

impl DailyUpdatesRequest {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
        }
    }
}
