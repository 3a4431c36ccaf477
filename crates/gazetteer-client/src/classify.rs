//! Response classification
//!
//! Pure mapping from what the transport produced onto the closed error
//! set. No side effects, no retries; the first attempt and the retry of a
//! call both classify through here.

use crate::error::{Error, ErrorPayload};

/// Classify a non-2xx response from its status and raw body.
///
/// An empty body maps to `EmptyBody`. A body matching the service's error
/// shape is preserved verbatim in `ServerErrorWithBody`; anything else
/// falls back to the bare status.
pub fn classify_failure(status: u16, body: &[u8]) -> Error {
    if body.is_empty() {
        return Error::EmptyBody;
    }
    match serde_json::from_slice::<ErrorPayload>(body) {
        Ok(payload) => Error::ServerErrorWithBody { status, payload },
        Err(_) => Error::Server(status),
    }
}

/// Classify a transport-level failure: the request never produced a
/// response. Timeouts land here too.
pub fn classify_transport(error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Transport(format!("request timed out: {error}"))
    } else {
        Error::Transport(error.to_string())
    }
}
