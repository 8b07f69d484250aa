//! TwinSync agent: the headless client that keeps two paired users' presence
//! signals (battery, location, steps, mood, shared photo) in sync with the
//! TwinSync backend.

pub mod api_client;
pub mod collector;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod sync;
