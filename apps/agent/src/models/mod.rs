pub mod auth;
pub mod daily;
pub mod partner;
pub mod snapshot;

pub use daily::DailyUpdate;
pub use partner::PartnerSnapshot;
pub use snapshot::{DeviceSnapshot, GeoPoint, UpdatePayload};
