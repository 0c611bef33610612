use std::sync::Arc;

use async_trait::async_trait;
use brightclass_client_core::{EnhancedProfile, RawProfile};

use crate::error::DirectoryError;

/// Keyed profile lookup against the hosted directory, plus the explicit
/// backend-side updates the client is allowed to trigger.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// `Ok(None)` when no profile row exists for the user.
    async fn raw_profile(&self, user_id: &str) -> Result<Option<RawProfile>, DirectoryError>;

    async fn touch_last_login(&self, user_id: &str) -> Result<(), DirectoryError>;
}

/// Fetches and enriches profiles. Lookup failures never reach the UI layer:
/// they are logged and collapse to `None`, the same observable outcome as a
/// missing row ("authenticated but profileless" is a valid, displayable
/// state).
pub struct ProfileFetcher {
    directory: Arc<dyn ProfileDirectory>,
}

impl ProfileFetcher {
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { directory }
    }

    pub async fn fetch(&self, user_id: &str) -> Option<EnhancedProfile> {
        match self.directory.raw_profile(user_id).await {
            Ok(Some(raw)) => Some(EnhancedProfile::from_raw(raw)),
            Ok(None) => {
                tracing::debug!(
                    target: "brightclass.auth",
                    user_id = %user_id,
                    "no profile row for authenticated user",
                );
                None
            }
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.auth",
                    user_id = %user_id,
                    error = %error,
                    "profile fetch failed; continuing without a profile",
                );
                None
            }
        }
    }

    pub fn directory(&self) -> &Arc<dyn ProfileDirectory> {
        &self.directory
    }
}
