use std::sync::Arc;

use serde_json::Value;

use crate::models::auth::TokenPair;
use crate::store::prefs::{PreferenceStore, StoreError};

pub const KEY_ACCESS: &str = "access_token";
pub const KEY_REFRESH: &str = "refresh_token";

/// Access/refresh token persistence. Unencrypted, no expiry tracking.
/// An absent or empty token reads as `None`, which callers treat as
/// "not authenticated".
#[derive(Clone)]
pub struct CredentialStore {
    prefs: Arc<PreferenceStore>,
}

impl CredentialStore {
    pub fn new(prefs: Arc<PreferenceStore>) -> Self {
        Self { prefs }
    }

    pub fn save(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        self.prefs.set_many(vec![
            (KEY_ACCESS, Value::from(access)),
            (KEY_REFRESH, Value::from(refresh)),
        ])
    }

    pub fn access(&self) -> Option<String> {
        self.prefs.get_string(KEY_ACCESS).filter(|t| !t.is_empty())
    }

    pub fn refresh(&self) -> Option<String> {
        self.prefs.get_string(KEY_REFRESH).filter(|t| !t.is_empty())
    }

    pub fn load(&self) -> Option<TokenPair> {
        Some(TokenPair {
            access: self.access()?,
            refresh: self.refresh()?,
        })
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.prefs.remove_many(&[KEY_ACCESS, KEY_REFRESH])
    }
}
