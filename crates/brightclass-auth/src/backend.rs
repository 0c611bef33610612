use async_trait::async_trait;
use brightclass_client_core::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::AuthError;

/// Auth lifecycle events pushed by the backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
        }
    }
}

/// One auth-state-change notification. `session` is present for sign-in and
/// token rotation, absent for sign-out.
#[derive(Debug, Clone)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Receiving half of an auth-state-change subscription. Dropping it ends the
/// subscription.
pub type AuthEventReceiver = mpsc::UnboundedReceiver<AuthStateChange>;

/// Narrow interface over the hosted auth endpoint. Implementations own the
/// wire protocol; this crate only orchestrates.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The authoritative current session, if the backend still considers one
    /// live.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Exchange a refresh token for a rotated session. Rotation invalidates
    /// the submitted token, which is why callers must never race two of
    /// these (see the session manager's single-flight refresh).
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    fn subscribe(&self) -> AuthEventReceiver;
}
