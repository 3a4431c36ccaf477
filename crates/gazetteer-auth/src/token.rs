//! Token refresh wire call
//!
//! The place service issues short-lived access tokens and long-lived
//! refresh tokens. `POST {base}/auth/refresh-token` trades the refresh
//! token for a new access token. The endpoint replies `201 Created` on
//! success; any other status, 200 included, is a rejection. The response
//! carries only a new access token, so the stored refresh token is never
//! rewritten here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path of the refresh endpoint relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Request body for the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response body of a successful (201) refresh.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Trade a refresh token for a new access token.
///
/// The timeout bounds the whole call so a hung refresh endpoint resolves
/// to an error instead of blocking whoever is waiting on the new token.
pub async fn request_refresh(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
    timeout: Duration,
) -> Result<String> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH);

    let response = client
        .post(&url)
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::CREATED {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::RefreshRejected(format!(
            "refresh endpoint returned {status}: {body}"
        )));
    }

    let parsed = response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::RefreshRejected(format!("invalid refresh response: {e}")))?;

    Ok(parsed.access_token)
}
