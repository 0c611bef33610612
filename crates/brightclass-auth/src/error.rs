use thiserror::Error;

/// Authentication error taxonomy.
///
/// `Clone` because one in-flight refresh fans its outcome out to every
/// concurrent caller; payloads are plain strings for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Bad credentials at sign-in. The one auth failure surfaced to the UI
    /// as user input feedback.
    #[error("{message}")]
    InvalidCredentials { message: String },

    /// The backend rejected the session or refresh token outright.
    #[error("{message}")]
    Unauthorized { message: String },

    /// No stored session to refresh.
    #[error("no session available to refresh")]
    NoSession,

    /// Transport or provider failure talking to the backend.
    #[error("{message}")]
    Backend { message: String },
}

impl AuthError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }
}

/// Failure looking up or updating a profile record in the directory.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DirectoryError {
    pub message: String,
}

impl DirectoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure inside a best-effort post-transition collaborator. Always logged,
/// never propagated past the effect boundary.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EffectError {
    pub message: String,
}

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
