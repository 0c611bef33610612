//! Foreground/tab-focus handling.
//!
//! The platform strategy is resolved once at startup. On web the
//! session-refresh hook is never registered: the backend SDK already runs
//! its own lock-based refresh on tab focus, and re-entering it from here
//! loops. That is a hard invariant of this component, not a tuning choice.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityStrategy {
    Web,
    Mobile { refresh_delay: Duration },
}

impl VisibilityStrategy {
    #[must_use]
    pub fn for_platform(platform: Platform, refresh_delay: Duration) -> Self {
        match platform {
            Platform::Web => Self::Web,
            Platform::Mobile => Self::Mobile { refresh_delay },
        }
    }

    #[must_use]
    pub fn allows_session_refresh(self) -> bool {
        matches!(self, Self::Mobile { .. })
    }

    fn refresh_delay(self) -> Duration {
        match self {
            Self::Web => Duration::ZERO,
            Self::Mobile { refresh_delay } => refresh_delay,
        }
    }
}

type VisibilityHook = Box<dyn Fn(bool) + Send + Sync>;
type SessionRefreshHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Hooks {
    on_visibility_change: Option<VisibilityHook>,
    on_session_refresh: Option<SessionRefreshHook>,
}

pub struct VisibilityCoordinator {
    strategy: VisibilityStrategy,
    hooks: Mutex<Hooks>,
    last_refresh: Mutex<Option<Instant>>,
}

impl VisibilityCoordinator {
    #[must_use]
    pub fn new(strategy: VisibilityStrategy) -> Self {
        Self {
            strategy,
            hooks: Mutex::new(Hooks::default()),
            last_refresh: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> VisibilityStrategy {
        self.strategy
    }

    pub fn set_on_visibility_change(&self, hook: impl Fn(bool) + Send + Sync + 'static) {
        self.lock_hooks().on_visibility_change = Some(Box::new(hook));
    }

    /// Registers the mobile refresh hook. On web the registration is
    /// refused: no session refresh may ever ride a visibility event there.
    pub fn set_on_session_refresh(&self, hook: impl Fn() + Send + Sync + 'static) {
        if !self.strategy.allows_session_refresh() {
            tracing::warn!(
                target: "brightclass.visibility",
                "refused session-refresh hook on web; visibility refresh is mobile-only",
            );
            return;
        }
        self.lock_hooks().on_session_refresh = Some(Box::new(hook));
    }

    /// Feed one platform visibility event through the coordinator.
    ///
    /// The telemetry hook sees every event. The refresh hook runs only on a
    /// became-visible event, only when registered, and only when the
    /// throttle window has elapsed; otherwise the event drops silently.
    pub fn handle_event(&self, visible: bool) {
        {
            let hooks = self.lock_hooks();
            if let Some(on_visibility_change) = hooks.on_visibility_change.as_ref() {
                on_visibility_change(visible);
            }
        }

        if !visible {
            return;
        }

        let should_refresh = {
            let hooks = self.lock_hooks();
            if hooks.on_session_refresh.is_none() {
                false
            } else {
                let mut last_refresh = self
                    .last_refresh
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let elapsed_enough = last_refresh
                    .map(|last| last.elapsed() >= self.strategy.refresh_delay())
                    .unwrap_or(true);
                if elapsed_enough {
                    *last_refresh = Some(Instant::now());
                }
                elapsed_enough
            }
        };

        if should_refresh {
            let hooks = self.lock_hooks();
            if let Some(on_session_refresh) = hooks.on_session_refresh.as_ref() {
                on_session_refresh();
            }
        } else {
            tracing::debug!(
                target: "brightclass.visibility",
                "visibility refresh dropped (throttled or not registered)",
            );
        }
    }

    /// Drop all hooks. Safe to call any number of times.
    pub fn teardown(&self) {
        let mut hooks = self.lock_hooks();
        hooks.on_visibility_change = None;
        hooks.on_session_refresh = None;
    }

    fn lock_hooks(&self) -> MutexGuard<'_, Hooks> {
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
