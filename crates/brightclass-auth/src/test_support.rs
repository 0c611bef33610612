//! Hand-rolled collaborator doubles shared by the crate's tests.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use brightclass_client_core::{
    AuthUser, EnhancedProfile, PlanTier, RawProfile, Role, SeatStatus, Session,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use tokio::sync::{Semaphore, mpsc};

use crate::backend::{AuthBackend, AuthEvent, AuthEventReceiver, AuthStateChange};
use crate::effects::{
    LoginRouter, MonitoringSink, MonitoringTraits, NavigationMode, PushRegistrar,
    PushRegistration, PushStatus, QueryCache, UserNotices,
};
use crate::error::{AuthError, DirectoryError, EffectError};
use crate::profile_fetcher::ProfileDirectory;

pub(crate) fn test_session(user_id: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        email: format!("{user_id}@brightclass.app"),
        access_token: format!("bc_at_{user_id}"),
        refresh_token: format!("bc_rt_{user_id}"),
        expires_at: Utc::now() + ChronoDuration::hours(1),
    }
}

pub(crate) fn expired_session(user_id: &str) -> Session {
    Session {
        expires_at: Utc::now() - ChronoDuration::hours(1),
        ..test_session(user_id)
    }
}

pub(crate) fn test_raw_profile(user_id: &str) -> RawProfile {
    RawProfile {
        id: user_id.to_string(),
        email: format!("{user_id}@brightclass.app"),
        role: Role::Teacher,
        first_name: "Avery".to_string(),
        last_name: "Nguyen".to_string(),
        avatar_url: None,
        organization_id: Some("org_hillside".to_string()),
        organization_name: Some("Hillside Elementary".to_string()),
        seat_status: SeatStatus::Active,
        capabilities: vec!["manage_classes".to_string(), "send_messages".to_string()],
        plan_tier: PlanTier::Standard,
        created_at: Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap(),
        last_login_at: None,
    }
}

pub(crate) fn enhanced_profile(user_id: &str) -> EnhancedProfile {
    EnhancedProfile::from_raw(test_raw_profile(user_id))
}

/// Scriptable backend double. Events are emitted manually so tests control
/// ordering exactly.
pub(crate) struct MockBackend {
    current: StdMutex<Option<Session>>,
    current_session_error: Option<String>,
    current_session_delay: Option<Duration>,
    sign_in_error: Option<String>,
    refresh_error: Option<String>,
    refresh_delay: Option<Duration>,
    hang_sign_out: bool,
    pub refresh_calls: AtomicUsize,
    pub current_session_calls: AtomicUsize,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    subscribers: StdMutex<Vec<mpsc::UnboundedSender<AuthStateChange>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            current: StdMutex::new(None),
            current_session_error: None,
            current_session_delay: None,
            sign_in_error: None,
            refresh_error: None,
            refresh_delay: None,
            hang_sign_out: false,
            refresh_calls: AtomicUsize::new(0),
            current_session_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            subscribers: StdMutex::new(Vec::new()),
        }
    }

    pub fn with_current_session(self, session: Session) -> Self {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
        self
    }

    pub fn with_failing_current_session(mut self, message: &str) -> Self {
        self.current_session_error = Some(message.to_string());
        self
    }

    pub fn with_current_session_delay(mut self, delay: Duration) -> Self {
        self.current_session_delay = Some(delay);
        self
    }

    pub fn with_sign_in_error(mut self, message: &str) -> Self {
        self.sign_in_error = Some(message.to_string());
        self
    }

    pub fn with_failing_refresh(mut self, message: &str) -> Self {
        self.refresh_error = Some(message.to_string());
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn with_hanging_sign_out(mut self) -> Self {
        self.hang_sign_out = true;
        self
    }

    pub fn emit(&self, change: AuthStateChange) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn emit_signed_in(&self, session: Session) {
        self.emit(AuthStateChange {
            event: AuthEvent::SignedIn,
            session: Some(session),
        });
    }

    pub fn emit_signed_out(&self) {
        self.emit(AuthStateChange {
            event: AuthEvent::SignedOut,
            session: None,
        });
    }

    pub fn emit_token_refreshed(&self, session: Session) {
        self.emit(AuthStateChange {
            event: AuthEvent::TokenRefreshed,
            session: Some(session),
        });
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.current_session_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.current_session_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.current_session_error.as_ref() {
            return Err(AuthError::backend(message.clone()));
        }
        Ok(self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Session, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.sign_in_error.as_ref() {
            return Err(AuthError::invalid_credentials(message.clone()));
        }
        let user_id = email.split('@').next().unwrap_or("u1");
        let session = test_session(user_id);
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_sign_out {
            std::future::pending::<()>().await;
        }
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.refresh_error.as_ref() {
            return Err(AuthError::unauthorized(message.clone()));
        }

        let user_id = refresh_token
            .strip_prefix("bc_rt_")
            .unwrap_or("u1")
            .split('_')
            .next()
            .unwrap_or("u1");
        let rotated = Session {
            access_token: format!("bc_at_rotated_{call}"),
            refresh_token: format!("bc_rt_{user_id}_rotated_{call}"),
            expires_at: Utc::now() + ChronoDuration::hours(1),
            ..test_session(user_id)
        };
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(rotated.clone());
        Ok(rotated)
    }

    fn subscribe(&self) -> AuthEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }
}

/// Directory double. With a gate installed, each lookup consumes one permit
/// first, letting tests freeze a fetch mid-flight.
pub(crate) struct MockDirectory {
    profiles: StdMutex<HashMap<String, RawProfile>>,
    fail_lookups: bool,
    fail_touch: bool,
    gate: Option<std::sync::Arc<Semaphore>>,
    pub fetch_calls: AtomicUsize,
    pub touch_calls: AtomicUsize,
}

impl MockDirectory {
    pub fn empty() -> Self {
        Self {
            profiles: StdMutex::new(HashMap::new()),
            fail_lookups: false,
            fail_touch: false,
            gate: None,
            fetch_calls: AtomicUsize::new(0),
            touch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(user_id: &str) -> Self {
        let directory = Self::empty();
        directory.insert(test_raw_profile(user_id));
        directory
    }

    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::empty()
        }
    }

    pub fn with_gate(mut self, gate: std::sync::Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_failing_touch(mut self) -> Self {
        self.fail_touch = true;
        self
    }

    pub fn insert(&self, profile: RawProfile) {
        self.profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileDirectory for MockDirectory {
    async fn raw_profile(&self, user_id: &str) -> Result<Option<RawProfile>, DirectoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gate.as_ref() {
            gate.acquire().await.expect("profile gate closed").forget();
        }
        if self.fail_lookups {
            return Err(DirectoryError::new("directory unavailable"));
        }
        Ok(self
            .profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(user_id)
            .cloned())
    }

    async fn touch_last_login(&self, _user_id: &str) -> Result<(), DirectoryError> {
        self.touch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_touch {
            return Err(DirectoryError::new("last-login update rejected"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingMonitoring {
    pub identified: StdMutex<Vec<(String, MonitoringTraits)>>,
    pub resets: AtomicUsize,
    pub events: StdMutex<Vec<String>>,
    pub fail_identify: bool,
}

impl RecordingMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_identify() -> Self {
        Self {
            fail_identify: true,
            ..Self::default()
        }
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl MonitoringSink for RecordingMonitoring {
    fn identify(&self, user: &AuthUser, traits: &MonitoringTraits) -> Result<(), EffectError> {
        if self.fail_identify {
            return Err(EffectError::new("analytics endpoint down"));
        }
        self.identified
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((user.id.clone(), traits.clone()));
        Ok(())
    }

    fn reset(&self) -> Result<(), EffectError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn track_event(&self, name: &str, _props: serde_json::Value) -> Result<(), EffectError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingPush {
    pub registered: StdMutex<Vec<String>>,
    pub deregistered: StdMutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl PushRegistrar for RecordingPush {
    async fn register_device(&self, user: &AuthUser) -> Result<PushRegistration, EffectError> {
        if self.fail {
            return Err(EffectError::new("push gateway unreachable"));
        }
        self.registered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(user.id.clone());
        Ok(PushRegistration {
            status: PushStatus::Registered,
            reason: None,
        })
    }

    async fn deregister_device(&self, user_id: &str) -> Result<(), EffectError> {
        if self.fail {
            return Err(EffectError::new("push gateway unreachable"));
        }
        self.deregistered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(user_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingRouter {
    pub after_login: StdMutex<Vec<(String, bool)>>,
    pub to_sign_in: StdMutex<Vec<NavigationMode>>,
}

impl RecordingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after_login_calls(&self) -> Vec<(String, bool)> {
        self.after_login
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sign_in_routes(&self) -> Vec<NavigationMode> {
        self.to_sign_in
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl LoginRouter for RecordingRouter {
    fn route_after_login(
        &self,
        user: &AuthUser,
        profile: Option<&EnhancedProfile>,
    ) -> Result<(), EffectError> {
        self.after_login
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((user.id.clone(), profile.is_some()));
        Ok(())
    }

    fn route_to_sign_in(&self, mode: NavigationMode) -> Result<(), EffectError> {
        self.to_sign_in
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(mode);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingCache {
    pub clears: AtomicUsize,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryCache for RecordingCache {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotices {
    pub messages: StdMutex<Vec<String>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl UserNotices for RecordingNotices {
    fn info(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}
