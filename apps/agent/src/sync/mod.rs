// Sync layer: everything that talks to the backend on behalf of the user.
// Each service holds the shared ApiClient and the credential store; none of
// them retries on its own.

pub mod account;
pub mod dispatcher;
pub mod partner;
pub mod updates;

use std::fmt;

use crate::api_client::ApiError;
use crate::store::CredentialStore;

pub use account::AccountService;
pub use dispatcher::SyncDispatcher;
pub use partner::{PartnerFetcher, PartnerSink, PartnerStatus, PartnerSummary, PartnerView};
pub use updates::UpdateService;

/// Result of one background attempt. Every failure is retryable; the
/// scheduler decides whether and when to try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Retry { reason: String },
}

impl SyncOutcome {
    pub fn retry(reason: impl fmt::Display) -> Self {
        SyncOutcome::Retry {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success)
    }
}

/// The stored access token, or `MissingCredential`.
pub(crate) fn access_token(credentials: &CredentialStore) -> Result<String, ApiError> {
    credentials.access().ok_or(ApiError::MissingCredential)
}
