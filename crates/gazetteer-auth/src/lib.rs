//! Credential management for the place service client
//!
//! Provides token storage, the refresh wire call, single-flight refresh
//! coordination, and session invalidation. This crate is a standalone
//! library with no dependency on the HTTP client crate; it can be tested
//! and used independently.
//!
//! Token flow:
//! 1. Login stores an access/refresh pair via `CredentialStore::save()`
//! 2. Requests read the access token via `CredentialStore::get()`
//! 3. A 401 sends callers to `RefreshCoordinator::await_refresh()`
//! 4. One `RefreshExecutor::refresh()` runs per cycle; the new access
//!    token is written back via `CredentialStore::set_access_token()`
//! 5. A terminal failure runs `SessionInvalidator::invalidate()`, which
//!    clears the pair and publishes `SessionEvent::LoggedOut`

pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod session;
pub mod token;

pub use coordinator::RefreshCoordinator;
pub use credentials::{Credential, CredentialStore, FileStore, MemoryStore};
pub use error::{Error, Result};
pub use refresh::{DEFAULT_REFRESH_TIMEOUT, RefreshExecutor, RefreshOutcome};
pub use session::{SessionEvent, SessionEvents, SessionInvalidator};
pub use token::{REFRESH_PATH, RefreshRequest, RefreshResponse, request_refresh};
