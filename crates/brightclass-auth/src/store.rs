//! Best-effort credential persistence.
//!
//! Every operation is infallible at the call site: storage failures are
//! logged and read back as "absent", so a platform without durable storage
//! degrades to "no restored session" instead of failing auth.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;

/// Keyed string storage surviving process restart (where the platform
/// provides it). Operations never error.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn remove(&self, key: &str);
}

/// In-memory store. Does not survive restart; the default for tests and for
/// embedders that wire their own persistence.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
    }
}

/// File-backed store: one JSON payload per key under `dir`, written through
/// a temp file and renamed so readers never observe a partial payload.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Some(value),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.store",
                    path = %path.display(),
                    error = %error,
                    "failed to read credential entry; treating as absent",
                );
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        if let Err(error) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(
                target: "brightclass.store",
                path = %self.dir.display(),
                error = %error,
                "failed to prepare credential store directory; dropping write",
            );
            return;
        }

        let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(error) = tokio::fs::write(&temp_path, value).await {
            tracing::warn!(
                target: "brightclass.store",
                path = %temp_path.display(),
                error = %error,
                "failed to write credential entry; dropping write",
            );
            return;
        }

        if let Err(error) = tokio::fs::rename(&temp_path, &path).await {
            tracing::warn!(
                target: "brightclass.store",
                path = %path.display(),
                error = %error,
                "failed to finalize credential entry; dropping write",
            );
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
    }

    async fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(
                    target: "brightclass.store",
                    path = %path.display(),
                    error = %error,
                    "failed to remove credential entry",
                );
            }
        }
    }
}

/// Store for platforms without durable storage: every operation is a no-op
/// and reads come back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCredentialStore;

#[async_trait]
impl CredentialStore for NoopCredentialStore {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str) {}

    async fn remove(&self, _key: &str) {}
}
