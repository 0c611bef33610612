//! Process-wide auth state machine.
//!
//! The orchestrator is the single writer of [`AuthSnapshot`]. Consumers
//! subscribe through a watch channel and render from whatever snapshot they
//! hold; `loading`/`profile_loading` are the only blocking signals. Boot
//! work and backend auth events may interleave: writes are last-wins, a
//! sign-out always fully clears state, and every async continuation
//! re-checks a generation counter plus the liveness flag before applying
//! its result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use brightclass_client_core::{AuthUser, EnhancedProfile, PermissionChecker, Session};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backend::{AuthBackend, AuthEvent, AuthStateChange};
use crate::config::{AuthConfig, Platform};
use crate::effects::{
    LoginRouter, MonitoringSink, MonitoringTraits, NavigationMode, NoopLoginRouter,
    NoopMonitoring, NoopNotices, NoopPushRegistrar, NoopQueryCache, PushRegistrar, PushStatus,
    QueryCache, UserNotices, run_effect,
};
use crate::error::AuthError;
use crate::profile_fetcher::{ProfileDirectory, ProfileFetcher};
use crate::session_manager::SessionManager;
use crate::store::CredentialStore;
use crate::visibility::{VisibilityCoordinator, VisibilityStrategy};

/// The process auth state exposed to consumers.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub profile: Option<EnhancedProfile>,
    pub permissions: PermissionChecker,
    pub loading: bool,
    pub profile_loading: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            user: None,
            session: None,
            profile: None,
            permissions: PermissionChecker::denied(),
            loading: true,
            profile_loading: false,
        }
    }

    fn anonymous() -> Self {
        Self {
            loading: false,
            ..Self::initial()
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }
}

pub struct AuthOrchestratorBuilder {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn CredentialStore>,
    directory: Arc<dyn ProfileDirectory>,
    monitoring: Arc<dyn MonitoringSink>,
    push: Arc<dyn PushRegistrar>,
    router: Arc<dyn LoginRouter>,
    query_cache: Arc<dyn QueryCache>,
    notices: Arc<dyn UserNotices>,
    config: AuthConfig,
}

impl AuthOrchestratorBuilder {
    pub fn monitoring(mut self, monitoring: Arc<dyn MonitoringSink>) -> Self {
        self.monitoring = monitoring;
        self
    }

    pub fn push(mut self, push: Arc<dyn PushRegistrar>) -> Self {
        self.push = push;
        self
    }

    pub fn router(mut self, router: Arc<dyn LoginRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn query_cache(mut self, query_cache: Arc<dyn QueryCache>) -> Self {
        self.query_cache = query_cache;
        self
    }

    pub fn notices(mut self, notices: Arc<dyn UserNotices>) -> Self {
        self.notices = notices;
        self
    }

    pub fn config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> AuthOrchestrator {
        let strategy = VisibilityStrategy::for_platform(
            self.config.platform,
            self.config.visibility_refresh_delay,
        );
        let (state_tx, _) = watch::channel(AuthSnapshot::initial());
        let sessions = SessionManager::new(
            self.store,
            Arc::clone(&self.backend),
            self.config.storage_key.clone(),
        );

        AuthOrchestrator {
            inner: Arc::new(Inner {
                sessions,
                backend: self.backend,
                profiles: ProfileFetcher::new(self.directory),
                monitoring: self.monitoring,
                push: self.push,
                router: self.router,
                query_cache: self.query_cache,
                notices: self.notices,
                config: self.config,
                visibility: VisibilityCoordinator::new(strategy),
                state_tx,
                alive: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                listener: std::sync::Mutex::new(None),
            }),
        }
    }
}

#[derive(Clone)]
pub struct AuthOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    sessions: SessionManager,
    backend: Arc<dyn AuthBackend>,
    profiles: ProfileFetcher,
    monitoring: Arc<dyn MonitoringSink>,
    push: Arc<dyn PushRegistrar>,
    router: Arc<dyn LoginRouter>,
    query_cache: Arc<dyn QueryCache>,
    notices: Arc<dyn UserNotices>,
    config: AuthConfig,
    visibility: VisibilityCoordinator,
    state_tx: watch::Sender<AuthSnapshot>,
    /// Cleared on shutdown; pending continuations discard their results.
    alive: AtomicBool,
    /// Bumped by every sign-out; continuations captured under an older
    /// generation discard their results, so a sign-out that races boot wins.
    generation: AtomicU64,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AuthOrchestrator {
    pub fn builder(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn CredentialStore>,
        directory: Arc<dyn ProfileDirectory>,
    ) -> AuthOrchestratorBuilder {
        AuthOrchestratorBuilder {
            backend,
            store,
            directory,
            monitoring: Arc::new(NoopMonitoring),
            push: Arc::new(NoopPushRegistrar),
            router: Arc::new(NoopLoginRouter),
            query_cache: Arc::new(NoopQueryCache),
            notices: Arc::new(NoopNotices),
            config: AuthConfig::default(),
        }
    }

    /// Subscribe to auth state. The receiver always holds the latest
    /// snapshot; readers never write.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.state_tx.borrow().clone()
    }

    /// Restore-and-reconcile boot sequence.
    ///
    /// Publishes the cached pair optimistically (when the cached session is
    /// not already expired) so the UI renders instantly with possibly-stale
    /// data, then asks the backend for the authoritative session and always
    /// re-fetches the profile fresh: a role revoked since the last run must
    /// not survive through the cache. `loading` resolves on every path.
    pub async fn boot(&self) {
        self.spawn_event_listener();
        self.register_visibility_hooks();
        let inner = &self.inner;
        let generation = inner.generation.load(Ordering::SeqCst);

        if let Some(restored) = inner.sessions.restore().await {
            if restored.session.is_expired(Utc::now()) {
                tracing::debug!(
                    target: "brightclass.auth",
                    user_id = %restored.session.user_id,
                    "cached session already expired; awaiting backend verdict",
                );
            } else if inner.still_live(generation) {
                let user = restored.session.user();
                let session = restored.session;
                let profile = restored.profile;
                inner.commit(|state| {
                    state.session = Some(session.clone());
                    state.user = Some(user.clone());
                    state.permissions = PermissionChecker::resolve(Some(&profile));
                    state.profile = Some(profile.clone());
                    // loading stays true until the backend confirms.
                });
            }
        }

        let live = match inner.backend.current_session().await {
            Ok(live) => live,
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.auth",
                    error = %error,
                    "backend session check failed; treating as no live session",
                );
                None
            }
        };
        if !inner.still_live(generation) {
            return;
        }

        match live {
            Some(session) => {
                let user = session.user();
                inner.commit(|state| {
                    state.session = Some(session.clone());
                    state.user = Some(user.clone());
                    state.profile_loading = true;
                });

                let profile = inner.profiles.fetch(&user.id).await;
                if !inner.still_live(generation) {
                    return;
                }
                inner.commit(|state| {
                    state.profile = profile.clone();
                    state.permissions = PermissionChecker::resolve(profile.as_ref());
                    state.loading = false;
                    state.profile_loading = false;
                });
                inner
                    .sessions
                    .persist(&session, profile.as_ref().map(|p| p.raw()))
                    .await;

                run_effect(
                    "monitoring.identify",
                    inner
                        .monitoring
                        .identify(&user, &MonitoringTraits::from_profile(profile.as_ref())),
                );
                tracing::info!(
                    target: "brightclass.auth",
                    user_id = %user.id,
                    "boot restored an authenticated session",
                );
            }
            None => {
                inner.commit(|state| *state = AuthSnapshot::anonymous());
                tracing::debug!(target: "brightclass.auth", "boot settled anonymous");
            }
        }
    }

    /// Re-fetch the profile for the current user, e.g. after a mutation that
    /// may have changed role or capabilities. No-op without a user.
    pub async fn refresh_profile(&self) {
        let inner = &self.inner;
        let user = inner.state_tx.borrow().user.clone();
        let Some(user) = user else {
            tracing::debug!(
                target: "brightclass.auth",
                "profile refresh requested without a user; ignoring",
            );
            return;
        };

        let generation = inner.generation.load(Ordering::SeqCst);
        inner.commit(|state| state.profile_loading = true);

        let profile = inner.profiles.fetch(&user.id).await;
        if !inner.still_live(generation) {
            return;
        }

        inner.commit(|state| {
            state.profile = profile.clone();
            state.permissions = PermissionChecker::resolve(profile.as_ref());
            state.profile_loading = false;
        });

        let session = inner.state_tx.borrow().session.clone();
        if let Some(session) = session {
            inner
                .sessions
                .persist(&session, profile.as_ref().map(|p| p.raw()))
                .await;
        }
    }

    /// Refresh the session now (mobile foreground, pre-emptive renewal).
    /// A failed refresh invalidates the session and runs the local
    /// signed-out path instead of leaving stale credentials live.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        self.inner.refresh_session().await
    }

    /// Surface bad credentials to the caller; the authenticated transition
    /// itself rides the backend's SIGNED_IN event.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        match self.inner.backend.sign_in_with_password(email, password).await {
            Ok(session) => Ok(session.user()),
            Err(error) => {
                tracing::debug!(
                    target: "brightclass.auth",
                    error = %error,
                    "sign-in rejected",
                );
                Err(error)
            }
        }
    }

    /// Explicit sign-out. Local state and the query cache are cleared
    /// synchronously before any network call, so the UI reflects logged-out
    /// immediately even if the backend call is slow or fails; navigation is
    /// attempted as the best-effort final step.
    pub async fn sign_out(&self) {
        let inner = &self.inner;
        tracing::info!(target: "brightclass.auth", "signing out");

        inner.generation.fetch_add(1, Ordering::SeqCst);
        inner.commit(|state| *state = AuthSnapshot::anonymous());
        inner.query_cache.clear();

        inner.sessions.clear().await;
        if let Err(error) = inner.backend.sign_out().await {
            tracing::warn!(
                target: "brightclass.auth",
                error = %error,
                "backend sign-out failed; local state already cleared",
            );
        }
        run_effect("monitoring.reset", inner.monitoring.reset());

        let mode = match inner.config.platform {
            Platform::Web => NavigationMode::Replace,
            Platform::Mobile => NavigationMode::Push,
        };
        run_effect("router.route_to_sign_in", inner.router.route_to_sign_in(mode));
    }

    /// Forward one platform visibility event.
    pub fn handle_visibility_change(&self, visible: bool) {
        self.inner.visibility.handle_event(visible);
    }

    /// Detach from the backend event stream, tear down visibility handling,
    /// and flip the liveness flag so pending continuations discard their
    /// results. Safe to call more than once.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.alive.store(false, Ordering::SeqCst);
        let listener = inner
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
        inner.visibility.teardown();
        tracing::debug!(target: "brightclass.auth", "auth orchestrator shut down");
    }

    fn spawn_event_listener(&self) {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if listener.is_some() {
            return;
        }

        let mut events = self.inner.backend.subscribe();
        let inner = Arc::clone(&self.inner);
        *listener = Some(tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                if !inner.alive.load(Ordering::SeqCst) {
                    break;
                }
                inner.apply_auth_state_change(change).await;
            }
        }));
    }

    fn register_visibility_hooks(&self) {
        let telemetry = Arc::downgrade(&self.inner);
        self.inner.visibility.set_on_visibility_change(move |visible| {
            if let Some(inner) = telemetry.upgrade() {
                run_effect(
                    "monitoring.track_event",
                    inner.monitoring.track_event(
                        "app_visibility_changed",
                        serde_json::json!({ "visible": visible }),
                    ),
                );
            }
        });

        if self.inner.visibility.strategy().allows_session_refresh() {
            let refresher = Arc::downgrade(&self.inner);
            self.inner.visibility.set_on_session_refresh(move || {
                if let Some(inner) = refresher.upgrade() {
                    tokio::spawn(async move {
                        let _ = inner.refresh_session().await;
                    });
                }
            });
        }
    }
}

impl Inner {
    fn commit(&self, mutate: impl FnOnce(&mut AuthSnapshot)) {
        self.state_tx.send_modify(mutate);
    }

    fn still_live(&self, generation: u64) -> bool {
        self.alive.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    async fn apply_auth_state_change(&self, change: AuthStateChange) {
        tracing::debug!(
            target: "brightclass.auth",
            event = change.event.as_str(),
            "auth state change",
        );
        match change.event {
            AuthEvent::SignedIn => match change.session {
                Some(session) => self.handle_signed_in(session).await,
                None => {
                    tracing::warn!(
                        target: "brightclass.auth",
                        "signed_in event without a session; ignoring",
                    );
                }
            },
            AuthEvent::SignedOut => self.handle_signed_out().await,
            AuthEvent::TokenRefreshed => {
                if let Some(session) = change.session {
                    self.handle_token_refreshed(session).await;
                }
            }
        }
    }

    async fn handle_signed_in(&self, session: Session) {
        let generation = self.generation.load(Ordering::SeqCst);
        let user = session.user();

        self.commit(|state| {
            state.session = Some(session.clone());
            state.user = Some(user.clone());
            state.loading = false;
            state.profile_loading = true;
        });

        let profile = self.profiles.fetch(&user.id).await;
        if !self.still_live(generation) {
            return;
        }

        self.commit(|state| {
            state.profile = profile.clone();
            state.permissions = PermissionChecker::resolve(profile.as_ref());
            state.profile_loading = false;
        });
        self.sessions
            .persist(&session, profile.as_ref().map(|p| p.raw()))
            .await;

        // Post-login effect list. Each effect is isolated: a failure is
        // logged and the rest still run; none can reverse the commit above.
        if let Err(error) = self.profiles.directory().touch_last_login(&user.id).await {
            tracing::warn!(
                target: "brightclass.effects",
                effect = "directory.touch_last_login",
                error = %error,
                "post-transition effect failed",
            );
        }
        match self.push.register_device(&user).await {
            Ok(registration) => match registration.status {
                PushStatus::Registered => {
                    tracing::debug!(target: "brightclass.effects", "push token registered");
                }
                PushStatus::Denied | PushStatus::Error => {
                    tracing::info!(
                        target: "brightclass.effects",
                        status = ?registration.status,
                        reason = registration.reason.as_deref().unwrap_or("unspecified"),
                        "push registration not completed",
                    );
                }
            },
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.effects",
                    effect = "push.register_device",
                    error = %error,
                    "post-transition effect failed",
                );
            }
        }
        run_effect(
            "monitoring.identify",
            self.monitoring
                .identify(&user, &MonitoringTraits::from_profile(profile.as_ref())),
        );
        run_effect(
            "router.route_after_login",
            self.router.route_after_login(&user, profile.as_ref()),
        );

        tracing::info!(
            target: "brightclass.auth",
            user_id = %user.id,
            has_profile = profile.is_some(),
            "signed in",
        );
    }

    /// Backend-driven sign-out. Clears state synchronously before any async
    /// cleanup. Navigation is owned by the explicit sign-out operation, not
    /// by this handler, so the two can never race on the history stack.
    async fn handle_signed_out(&self) {
        let prior_user = self.state_tx.borrow().user.clone();

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.commit(|state| *state = AuthSnapshot::anonymous());

        if let Some(user) = prior_user {
            if let Err(error) = self.push.deregister_device(&user.id).await {
                tracing::warn!(
                    target: "brightclass.effects",
                    effect = "push.deregister_device",
                    error = %error,
                    "post-transition effect failed",
                );
            }
        }
        run_effect("monitoring.reset", self.monitoring.reset());
        self.notices.info("You have been signed out.");

        tracing::info!(target: "brightclass.auth", "signed out");
    }

    async fn handle_token_refreshed(&self, session: Session) {
        let user = session.user();
        let cached_profile = self
            .state_tx
            .borrow()
            .profile
            .as_ref()
            .map(|profile| profile.raw().clone());

        self.commit(|state| {
            state.session = Some(session.clone());
            state.user = Some(user);
        });
        self.sessions.persist(&session, cached_profile.as_ref()).await;
        tracing::debug!(
            target: "brightclass.auth",
            expires_at = %session.expires_at,
            "session token rotated",
        );
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        match self.sessions.refresh().await {
            Ok(session) => {
                if self.alive.load(Ordering::SeqCst) {
                    let user = session.user();
                    self.commit(|state| {
                        state.session = Some(session.clone());
                        state.user = Some(user);
                    });
                }
                Ok(session)
            }
            Err(AuthError::NoSession) => {
                tracing::debug!(
                    target: "brightclass.auth",
                    "refresh requested without a session; ignoring",
                );
                Err(AuthError::NoSession)
            }
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.auth",
                    error = %error,
                    "session refresh failed; signing out locally",
                );
                self.force_local_sign_out().await;
                Err(error)
            }
        }
    }

    /// The signed-out path for irrecoverable auth failures: stale
    /// credentials must not stay live. No navigation here either.
    async fn force_local_sign_out(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.commit(|state| *state = AuthSnapshot::anonymous());
        self.sessions.clear().await;
        run_effect("monitoring.reset", self.monitoring.reset());
    }
}
