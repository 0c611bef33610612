//! Session restore, refresh, and teardown over the credential store.
//!
//! The session manager is the only component that touches credential
//! persistence. Its one hard concurrency guarantee: refreshes are
//! single-flight, because the backend rotates refresh tokens and a second
//! concurrent refresh would invalidate the first one's rotated session.

use std::sync::Arc;

use brightclass_client_core::{EnhancedProfile, RawProfile, Session, StoredAuthState};
use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;

use crate::backend::AuthBackend;
use crate::error::AuthError;
use crate::store::CredentialStore;

type SharedRefresh = Shared<BoxFuture<'static, Result<Session, AuthError>>>;

/// A cached session/profile pair read back from the store. Expiry is not
/// validated here; the caller reconciles against the backend.
#[derive(Debug, Clone)]
pub struct RestoredAuth {
    pub session: Session,
    pub profile: EnhancedProfile,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn AuthBackend>,
    storage_key: String,
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn AuthBackend>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            storage_key: storage_key.into(),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Read the cached pair without contacting the backend. Anything short
    /// of a well-formed session *and* profile reads as logged-out.
    pub async fn restore(&self) -> Option<RestoredAuth> {
        let raw = self.store.get(&self.storage_key).await?;
        let stored = match serde_json::from_str::<StoredAuthState>(&raw) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.session",
                    error = %error,
                    "cached auth state failed to parse; treating as absent",
                );
                return None;
            }
        };

        let session = stored.session?;
        let profile = stored.profile?;
        Some(RestoredAuth {
            session,
            profile: EnhancedProfile::from_raw(profile),
        })
    }

    /// Cache the pair for the next restore. Best-effort.
    pub async fn persist(&self, session: &Session, profile: Option<&RawProfile>) {
        let stored = StoredAuthState {
            session: Some(session.clone()),
            profile: profile.cloned(),
        };
        match serde_json::to_string(&stored) {
            Ok(payload) => self.store.set(&self.storage_key, &payload).await,
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.session",
                    error = %error,
                    "failed to encode auth state for caching",
                );
            }
        }
    }

    /// Exchange the stored refresh token for a rotated session.
    ///
    /// Single-flight: while a refresh is in flight its future sits in a
    /// shared slot and every concurrent caller awaits that same future, so N
    /// overlapping calls produce exactly one backend call and one shared
    /// outcome. The future clears the slot itself when it completes, so the
    /// next call after completion starts a fresh refresh.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let shared = {
            let mut slot = self.in_flight.lock().await;
            if let Some(existing) = slot.as_ref() {
                existing.clone()
            } else {
                let store = Arc::clone(&self.store);
                let backend = Arc::clone(&self.backend);
                let storage_key = self.storage_key.clone();
                let slot_handle = Arc::clone(&self.in_flight);

                let refresh = async move {
                    let result = run_refresh(&*store, &*backend, &storage_key).await;
                    *slot_handle.lock().await = None;
                    result
                };
                let shared = refresh.boxed().shared();
                *slot = Some(shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Drop the cached pair. Never errors.
    pub async fn clear(&self) {
        self.store.remove(&self.storage_key).await;
    }
}

async fn run_refresh(
    store: &dyn CredentialStore,
    backend: &dyn AuthBackend,
    storage_key: &str,
) -> Result<Session, AuthError> {
    let stored = match store.get(storage_key).await {
        Some(raw) => serde_json::from_str::<StoredAuthState>(&raw).unwrap_or_default(),
        None => StoredAuthState::default(),
    };

    let Some(current) = stored.session else {
        return Err(AuthError::NoSession);
    };

    tracing::debug!(
        target: "brightclass.session",
        user_id = %current.user_id,
        "refreshing session",
    );

    let rotated = backend.refresh_session(&current.refresh_token).await?;

    let payload = StoredAuthState {
        session: Some(rotated.clone()),
        profile: stored.profile,
    };
    match serde_json::to_string(&payload) {
        Ok(encoded) => store.set(storage_key, &encoded).await,
        Err(error) => {
            tracing::warn!(
                target: "brightclass.session",
                error = %error,
                "failed to cache rotated session",
            );
        }
    }

    tracing::debug!(
        target: "brightclass.session",
        user_id = %rotated.user_id,
        expires_at = %rotated.expires_at,
        seconds_left = (rotated.expires_at - Utc::now()).num_seconds(),
        "session refreshed",
    );
    Ok(rotated)
}
