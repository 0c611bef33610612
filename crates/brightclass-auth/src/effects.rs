//! Best-effort collaborators run after auth state commits.
//!
//! Every trait here sits outside the core transition: the orchestrator
//! commits state first, then runs these as an isolated effect list. A
//! failing collaborator is logged and skipped; it can neither block nor
//! reverse a state transition.

use async_trait::async_trait;
use brightclass_client_core::{AuthUser, EnhancedProfile, PlanTier, Role};
use serde::{Deserialize, Serialize};

use crate::error::EffectError;

/// Identification traits forwarded to monitoring/analytics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringTraits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_tier: Option<PlanTier>,
}

impl MonitoringTraits {
    #[must_use]
    pub fn from_profile(profile: Option<&EnhancedProfile>) -> Self {
        let Some(profile) = profile else {
            return Self::default();
        };
        Self {
            role: Some(profile.role()),
            organization_id: profile.organization_id().map(str::to_string),
            plan_tier: Some(profile.plan_tier()),
        }
    }
}

pub trait MonitoringSink: Send + Sync {
    fn identify(&self, user: &AuthUser, traits: &MonitoringTraits) -> Result<(), EffectError>;
    fn reset(&self) -> Result<(), EffectError>;
    fn track_event(&self, name: &str, props: serde_json::Value) -> Result<(), EffectError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    Registered,
    Denied,
    Error,
}

#[derive(Debug, Clone)]
pub struct PushRegistration {
    pub status: PushStatus,
    pub reason: Option<String>,
}

#[async_trait]
pub trait PushRegistrar: Send + Sync {
    async fn register_device(&self, user: &AuthUser) -> Result<PushRegistration, EffectError>;
    async fn deregister_device(&self, user_id: &str) -> Result<(), EffectError>;
}

/// How the sign-in entry point is reached on sign-out. `Replace` rewrites
/// history so back-navigation cannot land on an authenticated screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    Push,
    Replace,
}

pub trait LoginRouter: Send + Sync {
    fn route_after_login(
        &self,
        user: &AuthUser,
        profile: Option<&EnhancedProfile>,
    ) -> Result<(), EffectError>;

    fn route_to_sign_in(&self, mode: NavigationMode) -> Result<(), EffectError>;
}

/// External query/data cache cleared synchronously at the start of explicit
/// sign-out so stale authenticated data cannot flash after logout.
pub trait QueryCache: Send + Sync {
    fn clear(&self);
}

/// Non-blocking user-facing notices (e.g. the sign-out confirmation toast).
pub trait UserNotices: Send + Sync {
    fn info(&self, message: &str);
}

/// Log-and-continue boundary for one named effect.
pub(crate) fn run_effect(name: &str, result: Result<(), EffectError>) {
    if let Err(error) = result {
        tracing::warn!(
            target: "brightclass.effects",
            effect = name,
            error = %error,
            "post-transition effect failed",
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitoring;

impl MonitoringSink for NoopMonitoring {
    fn identify(&self, _user: &AuthUser, _traits: &MonitoringTraits) -> Result<(), EffectError> {
        Ok(())
    }

    fn reset(&self) -> Result<(), EffectError> {
        Ok(())
    }

    fn track_event(&self, _name: &str, _props: serde_json::Value) -> Result<(), EffectError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPushRegistrar;

#[async_trait]
impl PushRegistrar for NoopPushRegistrar {
    async fn register_device(&self, _user: &AuthUser) -> Result<PushRegistration, EffectError> {
        Ok(PushRegistration {
            status: PushStatus::Denied,
            reason: Some("push registration not wired".to_string()),
        })
    }

    async fn deregister_device(&self, _user_id: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoginRouter;

impl LoginRouter for NoopLoginRouter {
    fn route_after_login(
        &self,
        _user: &AuthUser,
        _profile: Option<&EnhancedProfile>,
    ) -> Result<(), EffectError> {
        Ok(())
    }

    fn route_to_sign_in(&self, _mode: NavigationMode) -> Result<(), EffectError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueryCache;

impl QueryCache for NoopQueryCache {
    fn clear(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotices;

impl UserNotices for NoopNotices {
    fn info(&self, _message: &str) {}
}
