//! Authorized HTTP client for the place service
//!
//! The pipeline in [`client`] is the heart of the crate: it attaches the
//! stored access token, sends exactly one request, and on a first 401
//! coordinates a token refresh with every other in-flight call before
//! retrying exactly once. Failures come back as the closed
//! [`error::Error`] taxonomy so callers can match on precisely what went
//! wrong. [`places`] layers the typed gazetteer endpoints on top.

pub mod classify;
pub mod client;
pub mod error;
pub mod places;
pub mod request;

mod metrics;

pub use classify::{classify_failure, classify_transport};
pub use client::{ApiClient, ClientOptions, DEFAULT_REQUEST_TIMEOUT};
pub use error::{Error, ErrorPayload, Result};
pub use places::{DeletedFavorite, Favorite, Place};
pub use request::RequestDescriptor;
