//! Authentication session lifecycle and permission orchestration for
//! brightclass clients.
//!
//! The [`orchestrator::AuthOrchestrator`] is the root component: it restores
//! cached sessions at boot, reconciles them against the hosted backend,
//! reacts to auth-state-change events, keeps the derived
//! [`brightclass_client_core::PermissionChecker`] consistent with the
//! profile it was built from, coalesces concurrent token refreshes, and
//! tears everything down on sign-out.

pub mod backend;
pub mod config;
pub mod effects;
pub mod error;
pub mod orchestrator;
pub mod profile_fetcher;
pub mod session_manager;
pub mod store;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{AuthBackend, AuthEvent, AuthEventReceiver, AuthStateChange};
pub use config::{AuthConfig, Platform};
pub use effects::{
    LoginRouter, MonitoringSink, MonitoringTraits, NavigationMode, PushRegistrar,
    PushRegistration, PushStatus, QueryCache, UserNotices,
};
pub use error::{AuthError, DirectoryError, EffectError};
pub use orchestrator::{AuthOrchestrator, AuthOrchestratorBuilder, AuthSnapshot};
pub use profile_fetcher::{ProfileDirectory, ProfileFetcher};
pub use session_manager::{RestoredAuth, SessionManager};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, NoopCredentialStore};
pub use visibility::{VisibilityCoordinator, VisibilityStrategy};

pub use brightclass_client_core::{
    AUTH_STORAGE_KEY, AuthUser, EnhancedProfile, PermissionChecker, PlanTier, RawProfile, Role,
    SeatStatus, Session, StoredAuthState, capability,
};
