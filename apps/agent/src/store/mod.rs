// Local persisted state: one unencrypted JSON preference file shared by the
// credential store and the step counter.

pub mod credentials;
pub mod prefs;

pub use credentials::CredentialStore;
pub use prefs::{PreferenceStore, StoreError};
