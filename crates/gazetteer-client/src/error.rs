//! Error taxonomy for the place service client
//!
//! The set is closed: every failure a caller can see is one of these
//! variants, so feature code can match exhaustively instead of probing
//! strings. Comparable (`PartialEq`) so tests assert on values.

use serde::{Deserialize, Serialize};

/// Structured error body the place service attaches to non-2xx responses.
///
/// `message` is required; the service omits `error` and `statusCode` on
/// some routes. Anything that fails to parse into this shape falls back
/// to the bare status classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Errors surfaced by the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The base URL plus path did not form a parseable URL. Raised before
    /// any network activity.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A response arrived but its body could not be materialized.
    #[error("invalid response from server")]
    InvalidResponse,

    /// A 2xx body did not decode into the caller's declared type.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// Non-2xx response with no body at all.
    #[error("empty response body")]
    EmptyBody,

    /// Non-2xx response carrying the service's structured error shape.
    #[error("server error {status}: {}", .payload.message)]
    ServerErrorWithBody { status: u16, payload: ErrorPayload },

    /// Non-2xx response without a parseable error body. Also the terminal
    /// result of an unrecoverable 401.
    #[error("server error {0}")]
    Server(u16),

    /// The transport failed before a response arrived (connect, TLS,
    /// timeout).
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
