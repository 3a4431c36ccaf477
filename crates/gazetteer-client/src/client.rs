//! Authorized request pipeline
//!
//! `ApiClient` owns the transport, a handle to the credential store, the
//! refresh coordinator, and session invalidation. Every call runs the
//! same way: attach the stored access token when one exists, execute one
//! transport call, classify what came back. The first 401 of a call
//! triggers one coordinated refresh and exactly one retry carrying the
//! refreshed token; a 401 on the retry is terminal. A failed refresh
//! invalidates the session before the terminal error is returned.
//!
//! Clones share the coordinator, store and event channel, so any number
//! of tasks can hold the same logical client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use gazetteer_auth::{
    CredentialStore, RefreshCoordinator, RefreshExecutor, RefreshOutcome, SessionEvent,
    SessionEvents, SessionInvalidator,
};

use crate::classify::{classify_failure, classify_transport};
use crate::error::{Error, Result};
use crate::request::RequestDescriptor;

/// Default bound on a single request attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for `ApiClient` construction.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: gazetteer_auth::DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

/// Authorized HTTP client for the place service.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    invalidator: SessionInvalidator,
    events: SessionEvents,
    request_timeout: Duration,
}

impl ApiClient {
    /// Client with default transport and timeouts.
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_options(
            reqwest::Client::new(),
            base_url,
            store,
            ClientOptions::default(),
        )
    }

    /// Client over a caller-provided transport.
    pub fn with_options(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        options: ClientOptions,
    ) -> Self {
        let base_url = base_url.into();
        let events = SessionEvents::new();
        let executor = RefreshExecutor::new(http.clone(), base_url.clone(), store.clone())
            .with_timeout(options.refresh_timeout);
        let coordinator = Arc::new(RefreshCoordinator::new(executor));
        let invalidator = SessionInvalidator::new(store.clone(), events.clone());

        Self {
            http,
            base_url,
            store,
            coordinator,
            invalidator,
            events,
            request_timeout: options.request_timeout,
        }
    }

    /// Subscribe to the process-wide logout signal.
    pub fn subscribe_logout(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Explicit logout: clears credentials and publishes the logout event.
    pub async fn logout(&self) {
        self.invalidator.invalidate().await;
    }

    /// GET returning a decoded JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let descriptor = RequestDescriptor::get(path).with_query(query);
        let body = self.send(&descriptor).await?;
        decode_json(&body)
    }

    /// POST with a JSON-encoded body, returning a decoded JSON body.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
        headers: HeaderMap,
    ) -> Result<T> {
        let payload = serde_json::to_vec(body).map_err(|e| Error::Encode(e.to_string()))?;
        let descriptor = RequestDescriptor::post(path)
            .with_query(query)
            .with_headers(headers)
            .with_body(Bytes::from(payload));
        let bytes = self.send(&descriptor).await?;
        decode_json(&bytes)
    }

    /// DELETE returning a decoded JSON body.
    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let descriptor = RequestDescriptor::delete(path).with_query(query);
        let body = self.send(&descriptor).await?;
        decode_json(&body)
    }

    /// GET returning the raw response bytes.
    pub async fn get_raw(&self, path: &str, query: &[(&str, &str)]) -> Result<Bytes> {
        let descriptor = RequestDescriptor::get(path).with_query(query);
        self.send(&descriptor).await
    }

    /// Run one logical call through the pipeline.
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<Bytes> {
        let request_id = format!("req_{}", Uuid::new_v4().as_simple());
        let method = descriptor.method.as_str().to_owned();
        let url = self.build_url(&descriptor.path)?;

        let token = self.store.get().await.map(|credential| credential.access);
        debug!(
            %request_id,
            method = %descriptor.method,
            path = %descriptor.path,
            authenticated = token.is_some(),
            "dispatching request"
        );

        let response = match self.dispatch(descriptor, url.clone(), token.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                crate::metrics::record_transport_error(&method);
                warn!(%request_id, error = %e, "transport failure");
                return Err(classify_transport(&e));
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(%request_id, "received 401, awaiting token refresh");
            match self.coordinator.await_refresh().await {
                RefreshOutcome::Success { access_token } => {
                    crate::metrics::record_retry(&method);
                    debug!(%request_id, "retrying with refreshed token");
                    let retry = match self.dispatch(descriptor, url, Some(&access_token)).await {
                        Ok(response) => response,
                        Err(e) => {
                            crate::metrics::record_transport_error(&method);
                            warn!(%request_id, error = %e, "transport failure on retry");
                            return Err(classify_transport(&e));
                        }
                    };
                    return self.finish(retry, &request_id, &method, true).await;
                }
                RefreshOutcome::Failure => {
                    warn!(%request_id, "token refresh failed, invalidating session");
                    self.invalidator.invalidate().await;
                    crate::metrics::record_request(&method, 401);
                    return Err(Error::Server(401));
                }
            }
        }

        self.finish(response, &request_id, &method, false).await
    }

    /// Classify the terminal response of an attempt.
    async fn finish(
        &self,
        response: reqwest::Response,
        request_id: &str,
        method: &str,
        retried: bool,
    ) -> Result<Bytes> {
        let status = response.status();
        crate::metrics::record_request(method, status.as_u16());

        if status == StatusCode::UNAUTHORIZED && retried {
            warn!(%request_id, "401 after refreshed retry, giving up");
            return Err(Error::Server(401));
        }

        if status.is_success() {
            let body = response.bytes().await.map_err(|e| {
                warn!(%request_id, error = %e, "failed to read response body");
                Error::InvalidResponse
            })?;
            debug!(
                %request_id,
                status = status.as_u16(),
                bytes = body.len(),
                "request completed"
            );
            return Ok(body);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = classify_failure(status.as_u16(), &body);
        warn!(%request_id, status = status.as_u16(), error = %error, "request failed");
        Err(error)
    }

    /// One transport call. The bearer token is attached here, after the
    /// caller headers, so the pipeline always owns Authorization.
    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        url: Url,
        token: Option<&str>,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut headers = descriptor.headers.clone();
        headers.remove(AUTHORIZATION);

        let mut request = self
            .http
            .request(descriptor.method.clone(), url)
            .headers(headers)
            .timeout(self.request_timeout);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            if !descriptor.headers.contains_key(CONTENT_TYPE) {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body.clone());
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request.send().await
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
    }
}

fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}
