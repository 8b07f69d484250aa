//! Partner Data Fetcher and its render step.
//!
//! A fetch resolves to one of five statuses, so that "the backend says you
//! have no partner" and "the backend could not be reached" lead to different
//! views instead of both falling through to the invitation flow.

use base64::Engine;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::errors::AgentError;
use crate::models::partner::PartnerSnapshot;
use crate::store::CredentialStore;
use crate::sync::access_token;

const IMAGE_DATA_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, PartialEq)]
pub enum PartnerStatus {
    Paired(PartnerSnapshot),
    /// The backend answered with a client error: no partner linked.
    Unpaired,
    /// No access token stored locally.
    SignedOut,
    /// The stored token was refused (401/403); the user has to log in again.
    Rejected(String),
    /// Network failure or server-side error; the pairing state is unknown.
    Unreachable(String),
}

#[derive(Clone)]
pub struct PartnerFetcher {
    api: ApiClient,
    credentials: CredentialStore,
}

impl PartnerFetcher {
    pub fn new(api: ApiClient, credentials: CredentialStore) -> Self {
        Self { api, credentials }
    }

    pub async fn fetch(&self) -> PartnerStatus {
        let token = match access_token(&self.credentials) {
            Ok(token) => token,
            Err(_) => return PartnerStatus::SignedOut,
        };

        match self.api.partner_data(&token).await {
            Ok(snapshot) => PartnerStatus::Paired(snapshot),
            Err(e) if e.is_auth_rejected() => {
                warn!("Access token rejected: {e}");
                PartnerStatus::Rejected(e.to_string())
            }
            Err(e) if e.is_unpaired() => {
                info!("Backend reports no linked partner: {e}");
                PartnerStatus::Unpaired
            }
            Err(e) => {
                warn!("Failed to fetch partner data: {e}");
                PartnerStatus::Unreachable(e.to_string())
            }
        }
    }

    /// The photo the partner shared, decoded. `Ok(None)` if none is shared.
    pub async fn partner_image(&self) -> Result<Option<Vec<u8>>, AgentError> {
        let token = access_token(&self.credentials)?;
        let snapshot = self.api.partner_data(&token).await?;
        match snapshot.shared_image {
            Some(data_url) => decode_image_data_url(&data_url).map(Some),
            None => Ok(None),
        }
    }
}

pub fn encode_image_data_url(bytes: &[u8]) -> String {
    format!(
        "{IMAGE_DATA_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Accepts either a full `data:image/jpeg;base64,` URL or a bare payload.
/// Line breaks inside the payload (MIME-style wrapping) are ignored.
pub fn decode_image_data_url(data_url: &str) -> Result<Vec<u8>, AgentError> {
    let data_url = data_url.trim();
    let payload = data_url.strip_prefix(IMAGE_DATA_PREFIX).unwrap_or(data_url);
    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AgentError::Image(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Render
// ────────────────────────────────────────────────────────────────────────────

/// Display fields for a partner snapshot. Unknown text fields become the
/// placeholders shown in the app ("Unknown", "-", 0, "Never"); battery stays
/// optional and is only formatted in `lines()`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerSummary {
    pub battery: Option<u8>,
    pub gps_lat: String,
    pub gps_lon: String,
    pub mood: String,
    pub steps: u64,
    pub updated_at: String,
    pub self_mood: String,
    pub map_link: Option<String>,
    pub has_image: bool,
}

impl From<&PartnerSnapshot> for PartnerSummary {
    fn from(snapshot: &PartnerSnapshot) -> Self {
        Self {
            battery: snapshot.battery,
            gps_lat: snapshot
                .gps_lat
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            gps_lon: snapshot
                .gps_lon
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            mood: snapshot.mood.clone().unwrap_or_else(|| "Unknown".to_string()),
            steps: snapshot.steps.unwrap_or(0),
            updated_at: snapshot
                .updated_at
                .clone()
                .unwrap_or_else(|| "Never".to_string()),
            self_mood: snapshot.self_mood.clone().unwrap_or_else(|| "--".to_string()),
            map_link: snapshot.location().map(|p| p.map_uri()),
            has_image: snapshot.shared_image.is_some(),
        }
    }
}

impl PartnerSummary {
    pub fn lines(&self) -> Vec<String> {
        let battery = match self.battery {
            Some(percent) => format!("Battery: {percent}%"),
            None => "Battery: Unknown".to_string(),
        };
        let location = if self.map_link.is_some() {
            format!("Location: {}, {}", self.gps_lat, self.gps_lon)
        } else {
            "Location: Not available".to_string()
        };

        vec![
            format!("Mood: {}", self.mood),
            battery,
            location,
            format!("Steps: {}", self.steps),
            format!("Last updated: {}", self.updated_at),
        ]
    }
}

/// What a UI surface should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum PartnerView {
    Loading,
    Partner(PartnerSummary),
    /// Invitation flow: create or accept an invite code.
    Invite,
    SignedOut,
}

/// Anything that renders partner views: a widget, a screen, a log.
pub trait PartnerSink: Send + Sync {
    fn render(&self, view: &PartnerView);
}

/// Renders to the log. Used by the headless daemon.
pub struct LogSink;

impl PartnerSink for LogSink {
    fn render(&self, view: &PartnerView) {
        match view {
            PartnerView::Loading => debug!("Partner view: loading"),
            PartnerView::Partner(summary) => info!("Partner: {}", summary.lines().join(" | ")),
            PartnerView::Invite => info!("No partner linked; share or accept an invite code"),
            PartnerView::SignedOut => info!("Not logged in"),
        }
    }
}

/// Publishes the latest view to any number of watchers.
impl PartnerSink for watch::Sender<PartnerView> {
    fn render(&self, view: &PartnerView) {
        self.send_replace(view.clone());
    }
}

/// The view for a fetch result, or `None` when the current view should stay.
pub fn view_for(status: &PartnerStatus) -> Option<PartnerView> {
    match status {
        PartnerStatus::Paired(snapshot) => Some(PartnerView::Partner(PartnerSummary::from(snapshot))),
        PartnerStatus::Unpaired => Some(PartnerView::Invite),
        PartnerStatus::SignedOut | PartnerStatus::Rejected(_) => Some(PartnerView::SignedOut),
        PartnerStatus::Unreachable(_) => None,
    }
}
