pub mod permissions;
pub mod profile;
pub mod session;

pub use permissions::{PermissionChecker, capability};
pub use profile::{EnhancedProfile, PlanTier, RawProfile, Role, SeatStatus};
pub use session::{AUTH_STORAGE_KEY, AuthUser, Session, StoredAuthState};
