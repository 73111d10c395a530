// # AdGuard Home client
//
// This crate provides the `ProtectionClient` implementation for the
// AdGuard Home control API.
//
// ## Behavior
//
// - Makes one HTTP request per call (no retry, no backoff - failures are
//   surfaced to the engine, which logs and waits for the next tick)
// - Basic auth on every request; credentials pass straight through from
//   the configuration
// - Strictly expects HTTP 200; any other status is an error, not a retry
// - No timeout beyond the transport defaults
// - Stateless: each call opens an independent request, so the poll task
//   and the toggle handler may call in concurrently
//
// ## API Reference
//
// - GET  `/control/status`     → `{"protection_enabled": bool, ...}`
// - POST `/control/dns_config` ← `{"protection_enabled": bool}`

use aghk_core::config::BridgeConfig;
use aghk_core::traits::ProtectionClient;
use aghk_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Status endpoint, relative to the configured base URL
const STATUS_ENDPOINT: &str = "/control/status";

/// DNS configuration endpoint, relative to the configured base URL
const DNS_CONFIG_ENDPOINT: &str = "/control/dns_config";

/// AdGuard Home control API client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the password.
pub struct AdGuardClient {
    /// Base URL of the AdGuard Home instance (no trailing slash)
    base_url: String,

    /// Basic auth username
    username: String,

    /// Basic auth password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for AdGuardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdGuardClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Relevant subset of the `/control/status` response body
#[derive(Debug, Deserialize)]
struct Status {
    protection_enabled: bool,
}

impl AdGuardClient {
    /// Create a new client
    ///
    /// # Parameters
    ///
    /// - `url`: AdGuard Home base URL (trailing slashes are trimmed)
    /// - `username`/`password`: basic auth credentials
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut base_url = url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            base_url,
            username: username.into(),
            password: password.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from the loaded bridge configuration
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.url, &config.username, &config.password)
    }
}

/// Map a response status to the error tiers the engine expects
fn check_status(what: &str, status: reqwest::StatusCode) -> Result<()> {
    match status.as_u16() {
        200 => Ok(()),
        401 | 403 => Err(Error::auth(format!("{} rejected with status {}", what, status))),
        code => Err(Error::protocol(format!("unexpected status code: {}", code))),
    }
}

#[async_trait]
impl ProtectionClient for AdGuardClient {
    async fn protection_enabled(&self) -> Result<bool> {
        let url = format!("{}{}", self.base_url, STATUS_ENDPOINT);
        tracing::debug!("Fetching protection state from {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| Error::http(format!("status request failed: {}", e)))?;

        check_status("status request", response.status())?;

        let status: Status = response
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed status body: {}", e)))?;

        Ok(status.protection_enabled)
    }

    async fn set_protection_enabled(&self, enabled: bool) -> Result<()> {
        let url = format!("{}{}", self.base_url, DNS_CONFIG_ENDPOINT);
        tracing::debug!("Setting protection enabled to {} via {}", enabled, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "protection_enabled": enabled }))
            .send()
            .await
            .map_err(|e| Error::http(format!("dns_config request failed: {}", e)))?;

        check_status("dns_config request", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client = AdGuardClient::new("http://adguard.local/", "u", "p");
        assert_eq!(client.base_url, "http://adguard.local");

        let client = AdGuardClient::new("http://adguard.local///", "u", "p");
        assert_eq!(client.base_url, "http://adguard.local");
    }

    #[test]
    fn password_not_exposed_in_debug() {
        let client = AdGuardClient::new("http://x", "admin", "hunter2-secret");

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("hunter2-secret"));
        assert!(debug_str.contains("<REDACTED>"));
        assert!(debug_str.contains("AdGuardClient"));
    }

    #[test]
    fn from_config_uses_connection_fields() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"url":"http://x/","username":"u","password":"p"}"#)
                .expect("config parses");

        let client = AdGuardClient::from_config(&config);
        assert_eq!(client.base_url, "http://x");
        assert_eq!(client.username, "u");
    }

    #[test]
    fn non_200_statuses_map_to_error_tiers() {
        assert!(check_status("status request", reqwest::StatusCode::OK).is_ok());

        let err = check_status("status request", reqwest::StatusCode::UNAUTHORIZED).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)), "got: {:?}", err);

        let err = check_status("status request", reqwest::StatusCode::FORBIDDEN).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)), "got: {:?}", err);

        let err =
            check_status("status request", reqwest::StatusCode::INTERNAL_SERVER_ERROR).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got: {:?}", err);
        assert!(err.to_string().contains("unexpected status code: 500"));

        // 2xx other than 200 is still unexpected for this API
        let err = check_status("status request", reqwest::StatusCode::NO_CONTENT).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got: {:?}", err);
    }
}
