//! Role and capability resolution for permission-gated UI.
//!
//! Deterministic and I/O free: a [`PermissionChecker`] is derived from one
//! profile snapshot and never mutated. A missing profile resolves to the
//! denied checker; there is no ambient default-allow state.

use std::collections::HashSet;

use crate::profile::{EnhancedProfile, Role};

/// Well-known capability strings carried in `RawProfile.capabilities`.
pub mod capability {
    pub const MANAGE_CLASSES: &str = "manage_classes";
    pub const MANAGE_STAFF: &str = "manage_staff";
    pub const MANAGE_BILLING: &str = "manage_billing";
    pub const VIEW_REPORTS: &str = "view_reports";
    pub const SEND_MESSAGES: &str = "send_messages";
    pub const VIEW_CHILD_PROGRESS: &str = "view_child_progress";
    pub const SUBMIT_ASSIGNMENTS: &str = "submit_assignments";
}

/// Immutable permission queries derived from one profile snapshot.
///
/// Capability checks are multiplicatively gated on an active seat: a
/// suspended teacher still reads as `has_role(Role::Teacher)` for labelling,
/// but every capability check fails until the seat is active again.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionChecker {
    role: Option<Role>,
    capabilities: HashSet<String>,
    seat_active: bool,
    organization_id: Option<String>,
}

impl PermissionChecker {
    /// The all-deny checker used whenever no profile is available.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            role: None,
            capabilities: HashSet::new(),
            seat_active: false,
            organization_id: None,
        }
    }

    #[must_use]
    pub fn resolve(profile: Option<&EnhancedProfile>) -> Self {
        let Some(profile) = profile else {
            return Self::denied();
        };

        Self {
            role: Some(profile.role()),
            capabilities: profile.capability_set().clone(),
            seat_active: profile.seat_status().is_active(),
            organization_id: profile.organization_id().map(str::to_string),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.is_some_and(|held| roles.contains(&held))
    }

    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.seat_active && self.capabilities.contains(capability)
    }

    #[must_use]
    pub fn has_all_capabilities(&self, capabilities: &[&str]) -> bool {
        capabilities
            .iter()
            .all(|capability| self.has_capability(capability))
    }

    #[must_use]
    pub fn has_active_seat(&self) -> bool {
        self.seat_active
    }

    #[must_use]
    pub fn in_organization(&self, organization_id: &str) -> bool {
        self.organization_id.as_deref() == Some(organization_id)
    }

    /// Staff shell surfaces (class rosters, org settings entry points).
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role.is_some_and(Role::is_staff)
    }
}

impl Default for PermissionChecker {
    fn default() -> Self {
        Self::denied()
    }
}
