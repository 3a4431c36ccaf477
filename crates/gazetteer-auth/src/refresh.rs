//! One refresh attempt against the place service
//!
//! `RefreshExecutor` wraps the wire call with the credential store: it
//! reads the refresh token, performs the exchange, and writes the new
//! access token back. Callers see only a `RefreshOutcome`; the error detail
//! lands in the logs. The executor never touches the refresh token and
//! never clears the store, whatever the outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::token;

/// Default bound on a single refresh attempt.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one refresh cycle, fanned out to every waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The endpoint issued a new access token.
    Success { access_token: String },
    /// No refresh token, endpoint rejection, timeout, or a malformed
    /// response. The session is not recoverable without a new login.
    Failure,
}

impl RefreshOutcome {
    /// Label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Success { .. } => "success",
            RefreshOutcome::Failure => "failure",
        }
    }
}

/// Performs a single token refresh against the service.
#[derive(Clone)]
pub struct RefreshExecutor {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl RefreshExecutor {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one refresh attempt.
    ///
    /// Fails fast without a network call when the store holds no
    /// credential. On success the new access token is written back to the
    /// store; a persistence error is logged and does not downgrade the
    /// outcome, since the returned token itself is good.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(credential) = self.store.get().await else {
            warn!("refresh requested with no stored credential");
            return RefreshOutcome::Failure;
        };

        match token::request_refresh(&self.client, &self.base_url, &credential.refresh, self.timeout)
            .await
        {
            Ok(access_token) => {
                if let Err(e) = self.store.set_access_token(access_token.clone()).await {
                    warn!(error = %e, "refreshed token could not be persisted");
                }
                debug!("access token refreshed");
                RefreshOutcome::Success { access_token }
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                RefreshOutcome::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};

    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use tokio::net::TcpListener;

    use crate::credentials::MemoryStore;
    use crate::token::REFRESH_PATH;

    fn seeded_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_credential(crate::credentials::Credential {
            access: "at_stale".into(),
            refresh: "rt_1".into(),
        }))
    }

    /// Mock refresh endpoint counting hits, answering with a fixed status.
    async fn start_counting_server(
        status: StatusCode,
        body: serde_json::Value,
    ) -> (String, Arc<AtomicU64>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");
        let hits = Arc::new(AtomicU64::new(0));
        let hits_server = hits.clone();

        let handle = tokio::spawn(async move {
            let app = axum::Router::new().route(
                REFRESH_PATH,
                post(move || {
                    let body = body.clone();
                    hits_server.fetch_add(1, Ordering::SeqCst);
                    async move { (status, Json(body)) }
                }),
            );
            axum::serve(listener, app).await.unwrap();
        });

        (url, hits, handle)
    }

    #[tokio::test]
    async fn success_stores_new_access_token() {
        let (url, hits, _server) = start_counting_server(
            StatusCode::CREATED,
            serde_json::json!({"accessToken": "at_new"}),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let store = seeded_store();
        let executor = RefreshExecutor::new(reqwest::Client::new(), &url, store.clone());

        let outcome = executor.refresh().await;
        assert_eq!(
            outcome,
            RefreshOutcome::Success {
                access_token: "at_new".into()
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let cred = store.get().await.unwrap();
        assert_eq!(cred.access, "at_new");
        assert_eq!(cred.refresh, "rt_1", "refresh token must survive");
    }

    #[tokio::test]
    async fn rejection_leaves_store_untouched() {
        let (url, hits, _server) = start_counting_server(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"message": "revoked"}),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let store = seeded_store();
        let executor = RefreshExecutor::new(reqwest::Client::new(), &url, store.clone());

        let outcome = executor.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Failure);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let cred = store.get().await.unwrap();
        assert_eq!(cred.access, "at_stale", "failed refresh must not mutate the store");
        assert_eq!(cred.refresh, "rt_1");
    }

    #[tokio::test]
    async fn empty_store_fails_fast_without_network_call() {
        let (url, hits, _server) = start_counting_server(
            StatusCode::CREATED,
            serde_json::json!({"accessToken": "at_new"}),
        )
        .await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let store = Arc::new(MemoryStore::new());
        let executor = RefreshExecutor::new(reqwest::Client::new(), &url, store);

        let outcome = executor.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Failure);
        assert_eq!(hits.load(Ordering::SeqCst), 0, "no credential means no wire call");
    }

    #[tokio::test]
    async fn timeout_resolves_to_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let _server = tokio::spawn(async move {
            let app = axum::Router::new().route(
                REFRESH_PATH,
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    StatusCode::CREATED
                }),
            );
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let store = seeded_store();
        let executor = RefreshExecutor::new(reqwest::Client::new(), &url, store.clone())
            .with_timeout(Duration::from_millis(100));

        let outcome = executor.refresh().await;
        assert_eq!(outcome, RefreshOutcome::Failure);

        let cred = store.get().await.unwrap();
        assert_eq!(cred.access, "at_stale");
    }
}
