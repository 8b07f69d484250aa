// Backend routes, relative to the configured API base (`.../api`).
// Trailing slashes are required by the backend router.

pub const REGISTER: &str = "/auth/register/";
pub const LOGIN: &str = "/auth/login/";
pub const LOGOUT: &str = "/auth/logout/";

pub const CREATE_INVITATION: &str = "/invitation/create-invitation/";
pub const ACCEPT_INVITATION: &str = "/invitation/accept-invitation/";
pub const UNLINK: &str = "/invitation/unlink/";

pub const USERDATA_UPDATE: &str = "/userdata/update/";
pub const PARTNER_DATA: &str = "/userdata/partner-data/";
pub const DAILY_UPDATES: &str = "/userdata/daily-updates/";
