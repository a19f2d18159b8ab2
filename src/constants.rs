/// User agent string for HTTP requests
pub const USER_AGENT: &str = concat!("qweather-mcp/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout applied by the shared HTTP client, in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lifetime of a signed token, in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 900;

/// Tokens are regenerated once they are this close to expiry, in seconds
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

/// Header carrying a static API key
pub const API_KEY_HEADER: &str = "x-qw-api-key";

/// Default response language
pub const DEFAULT_LANG: &str = "zh";

/// Offset of the provider's reference timezone (Beijing) from UTC, in hours
pub const BEIJING_UTC_OFFSET_HOURS: i32 = 8;

/// Furthest day ahead the astronomy endpoints accept
pub const ASTRONOMY_MAX_DAYS_AHEAD: i64 = 60;

/// Maximum number of past days the historical endpoints serve
pub const HISTORY_MAX_DAYS: u32 = 10;

/// Pause between the per-day requests of a historical query, in milliseconds
pub const HISTORY_REQUEST_PAUSE_MS: u64 = 100;

// Environment variables
pub const ENV_API_HOST: &str = "HEFENG_API_HOST";
pub const ENV_API_KEY: &str = "HEFENG_API_KEY";
pub const ENV_PROJECT_ID: &str = "HEFENG_PROJECT_ID";
pub const ENV_KEY_ID: &str = "HEFENG_KEY_ID";
pub const ENV_PRIVATE_KEY_PATH: &str = "HEFENG_PRIVATE_KEY_PATH";
pub const ENV_PRIVATE_KEY: &str = "HEFENG_PRIVATE_KEY";
