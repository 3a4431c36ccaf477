//! Credential storage for the place service session
//!
//! A session owns exactly one access/refresh token pair. The store is
//! injected into every component that touches tokens; nothing reaches it
//! through a global. Writers are deliberately narrow: login saves the pair,
//! the refresh executor rewrites only the access token, and session
//! invalidation clears both.
//!
//! Two implementations ship here. `MemoryStore` backs tests and embedders
//! that persist elsewhere. `FileStore` keeps the credential in a JSON file
//! with atomic writes, for the CLI.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// An access/refresh token pair for the place service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Current access token (Bearer token for API calls)
    pub access: String,
    /// Refresh token for obtaining new access tokens
    pub refresh: String,
}

/// Token storage consumed by the request pipeline, the refresh executor and
/// session invalidation.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    /// Clone of the stored credential, if any.
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<Credential>> + Send + '_>>;

    /// Replace the access token after a refresh, leaving the refresh token
    /// untouched. Errors with `NotFound` when no credential is stored.
    fn set_access_token(
        &self,
        access: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Store a full token pair. Login is the only writer of both tokens.
    fn save(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Drop the stored credential. Clearing an empty store is a no-op.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// In-memory credential store.
///
/// Reads take the lock briefly to clone the pair, so request-time reads
/// don't block behind a refresh writing the new token.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting out with a credential already present.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            state: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<Credential>> + Send + '_>> {
        Box::pin(async move { self.state.read().await.clone() })
    }

    fn set_access_token(
        &self,
        access: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let credential = state
                .as_mut()
                .ok_or_else(|| Error::NotFound("no credential to update".into()))?;
            credential.access = access;
            debug!("updated access token");
            Ok(())
        })
    }

    fn save(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            *state = Some(Credential { access, refresh });
            debug!("saved credential");
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            *state = None;
            debug!("cleared credential");
            Ok(())
        })
    }
}

/// File-backed credential store.
///
/// The credential lives in a single JSON document (`null` when logged out).
/// All writes go through atomic temp-file + rename to prevent corruption on
/// crash, and the file is chmod 0600 since it holds live tokens. A tokio
/// Mutex serializes writers.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Option<Credential>>,
}

impl FileStore {
    /// Load the credential from the given file path.
    ///
    /// If the file doesn't exist, creates it holding `null` (logged-out
    /// cold start) so future loads skip the cold-start path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let credential: Option<Credential> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(
                path = %path.display(),
                logged_in = credential.is_some(),
                "loaded credential file"
            );
            credential
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            write_atomic(&path, &None).await?;
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Pin<Box<dyn Future<Output = Option<Credential>> + Send + '_>> {
        Box::pin(async move { self.state.lock().await.clone() })
    }

    fn set_access_token(
        &self,
        access: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let credential = state
                .as_mut()
                .ok_or_else(|| Error::NotFound("no credential to update".into()))?;
            credential.access = access;
            debug!("updated access token");
            write_atomic(&self.path, &state).await
        })
    }

    fn save(
        &self,
        access: String,
        refresh: String,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = Some(Credential { access, refresh });
            debug!("saved credential");
            write_atomic(&self.path, &state).await
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = None;
            debug!("cleared credential");
            write_atomic(&self.path, &state).await
        })
    }
}

/// Write the credential to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains live tokens.
async fn write_atomic(path: &Path, data: &Option<Credential>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
