use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a profile holds inside its school organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Principal,
    Teacher,
    Parent,
    Student,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
            Self::Student => "student",
        }
    }

    /// Staff roles carry organization-management surfaces in the app shell.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Principal | Self::Teacher)
    }
}

/// Whether a profile's organization seat is currently live.
///
/// A seat that is not `Active` keeps its role label but loses every
/// capability until the seat is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Active,
    Invited,
    Suspended,
    Revoked,
}

impl SeatStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invited => "invited",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
        }
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Standard,
    Premium,
}

impl PlanTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

/// Backend-owned user record. The client reads it and triggers backend-side
/// updates (last-login touch) through explicit directory calls only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProfile {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    pub seat_status: SeatStatus,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub plan_tier: PlanTier,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Derived, read-only view of a [`RawProfile`].
///
/// [`EnhancedProfile::from_raw`] is the only constructor. Anything that did
/// not come through it is a raw record and gets rebuilt; there is no runtime
/// probe for "looks already enhanced". The view is rebuilt wholesale whenever
/// the raw record changes, so role and capabilities always describe the same
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedProfile {
    raw: RawProfile,
    capability_set: HashSet<String>,
}

impl EnhancedProfile {
    #[must_use]
    pub fn from_raw(raw: RawProfile) -> Self {
        let capability_set = raw
            .capabilities
            .iter()
            .map(|capability| capability.trim().to_string())
            .filter(|capability| !capability.is_empty())
            .collect();
        Self {
            raw,
            capability_set,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.raw.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.raw.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.raw.role
    }

    #[must_use]
    pub fn seat_status(&self) -> SeatStatus {
        self.raw.seat_status
    }

    #[must_use]
    pub fn plan_tier(&self) -> PlanTier {
        self.raw.plan_tier
    }

    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.raw.organization_id.as_deref()
    }

    #[must_use]
    pub fn organization_name(&self) -> Option<&str> {
        self.raw.organization_name.as_deref()
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.raw.first_name.trim(), self.raw.last_name.trim());
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.raw.email.clone()
        } else {
            trimmed.to_string()
        }
    }

    /// Raw capability membership, before any seat gating. Permission checks
    /// go through [`crate::PermissionChecker`].
    #[must_use]
    pub fn lists_capability(&self, capability: &str) -> bool {
        self.capability_set.contains(capability)
    }

    #[must_use]
    pub fn capability_set(&self) -> &HashSet<String> {
        &self.capability_set
    }

    /// The backing record, e.g. for persistence.
    #[must_use]
    pub fn raw(&self) -> &RawProfile {
        &self.raw
    }
}
