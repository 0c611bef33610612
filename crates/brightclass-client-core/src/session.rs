use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide key under which the cached session/profile pair is persisted.
///
/// The suffix is a shape version: changing `StoredAuthState` requires bumping
/// it so stale payloads read as absent instead of half-parsing.
pub const AUTH_STORAGE_KEY: &str = "brightclass.auth.v1";

/// An authenticated backend connection: token pair plus absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// An expired session must not be treated as valid by any consumer
    /// without a successful refresh.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session expires within `window` of `now`. Used to refresh
    /// proactively instead of racing the expiry on the next request.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expires_at <= now + window
    }

    #[must_use]
    pub fn user(&self) -> AuthUser {
        AuthUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

/// Minimal identity projection of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Serialized shape persisted under [`AUTH_STORAGE_KEY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredAuthState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<crate::profile::RawProfile>,
}
