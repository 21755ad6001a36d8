//! parkrun profile page client
//!
//! Fetches the HTML profile page for an athlete. The URL is a template with an
//! `{id}` placeholder so the request can be routed through a proxy endpoint
//! instead of hitting parkrun directly.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::ClientHints;

/// Default profile page template
pub const DEFAULT_PROFILE_URL: &str = "https://www.parkrun.org.uk/parkrunner/{id}/";

/// Placeholder replaced with the numeric athlete key
pub const ID_PLACEHOLDER: &str = "{id}";

/// User agent sent when forwarding is on but the client did not send one
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Address sent when forwarding is on but the client IP is unknown
const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// Errors that can occur when fetching a profile page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Raw upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePage {
    /// HTTP status code
    pub status: u16,
    /// Response body text
    pub body: String,
}

impl ProfilePage {
    /// Whether the status code is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source of athlete profile pages
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetches the profile page for the numeric athlete key
    async fn fetch_profile(&self, key: &str, hints: &ClientHints) -> Result<ProfilePage, FetchError>;
}

/// Client for parkrun profile pages
#[derive(Debug, Clone)]
pub struct ParkrunClient {
    http_client: Client,
    profile_url: String,
    proxy_key: Option<String>,
    forward_client_headers: bool,
}

impl Default for ParkrunClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkrunClient {
    /// Creates a client pointed directly at parkrun
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            proxy_key: None,
            forward_client_headers: false,
        }
    }

    /// Uses a custom profile URL template (must contain `{id}`)
    pub fn with_profile_url(mut self, profile_url: impl Into<String>) -> Self {
        self.profile_url = profile_url.into();
        self
    }

    /// Sends `key` in the `x-api-key` header on every request
    pub fn with_proxy_key(mut self, key: Option<String>) -> Self {
        self.proxy_key = key;
        self
    }

    /// Forwards the inbound client's user agent, IP and cookies upstream
    pub fn with_forwarded_headers(mut self, enabled: bool) -> Self {
        self.forward_client_headers = enabled;
        self
    }

    /// Builds the profile URL for a numeric athlete key
    pub fn profile_url(&self, key: &str) -> String {
        self.profile_url.replace(ID_PLACEHOLDER, key)
    }
}

#[async_trait]
impl ProfileSource for ParkrunClient {
    async fn fetch_profile(&self, key: &str, hints: &ClientHints) -> Result<ProfilePage, FetchError> {
        let url = self.profile_url(key);
        let mut request = self.http_client.get(&url);

        if let Some(ref proxy_key) = self.proxy_key {
            request = request.header("x-api-key", proxy_key);
        }

        if self.forward_client_headers {
            let ip = hints.real_ip.as_deref().unwrap_or(FALLBACK_CLIENT_IP);
            request = request
                .header(
                    "user-agent",
                    hints.user_agent.as_deref().unwrap_or(FALLBACK_USER_AGENT),
                )
                .header("x-real-ip", ip)
                .header("x-forwarded-for", ip)
                .header("forwarded", format!("for={}", ip));

            if let Some(ref cookie) = hints.cookie {
                request = request.header("cookie", cookie);
            }
        }

        tracing::debug!(%url, "fetching profile page");

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ProfilePage { status, body })
    }
}
