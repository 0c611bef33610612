use std::time::Duration;

use brightclass_client_core::AUTH_STORAGE_KEY;

/// Minimum gap between visibility-triggered session refreshes.
pub const DEFAULT_VISIBILITY_REFRESH_DELAY_MS: u64 = 30_000;

/// Host platform, resolved once at startup. Everything platform-dependent
/// (visibility refresh, navigation mode on sign-out) derives from this value
/// instead of re-branching inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Web,
    Mobile,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub platform: Platform,
    /// Key the cached session/profile pair lives under.
    pub storage_key: String,
    pub visibility_refresh_delay: Duration,
}

impl AuthConfig {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            storage_key: AUTH_STORAGE_KEY.to_string(),
            visibility_refresh_delay: Duration::from_millis(DEFAULT_VISIBILITY_REFRESH_DELAY_MS),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(Platform::Web)
    }
}
