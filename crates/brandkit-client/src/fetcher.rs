use std::net::IpAddr;
use std::time::Duration;

use brandkit_core::error::{AppError, UpstreamReason};
use brandkit_core::models::FetchedPage;
use brandkit_core::traits::Fetcher;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response, redirect};
use url::Url;

const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 10;

/// Which destination addresses a fetch may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressPolicy {
    /// Public addresses only.
    Public,
    /// Public addresses plus loopback, for a scanner pointed at a local dev server.
    PublicAndLoopback,
    /// No address checks.
    Any,
}

impl AddressPolicy {
    fn blocks(self, ip: IpAddr) -> bool {
        match self {
            AddressPolicy::Public => is_private_ip(ip),
            AddressPolicy::PublicAndLoopback => is_private_ip(ip) && !ip.is_loopback(),
            AddressPolicy::Any => false,
        }
    }
}

/// HTTP fetcher using reqwest.
///
/// Downloads a page with configurable User-Agent, timeout and body size cap.
/// By default, SSRF protection is **enabled**: requests to private/reserved
/// IP ranges are blocked, including redirect targets, which are followed
/// one hop at a time so each hop is checked. Use
/// [`allow_private_urls`](Self::allow_private_urls) to disable this (e.g.,
/// for CLI usage where the user controls the machine).
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    max_body_bytes: usize,
    address_policy: AddressPolicy,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(20))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("Brandkit/0.1 (+profile scanner)")
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            address_policy: AddressPolicy::Public,
        })
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only use this for CLI usage where the user controls the machine.
    pub fn allow_private_urls(mut self) -> Self {
        self.address_policy = AddressPolicy::Any;
        self
    }

    /// Allow loopback addresses while still blocking every other
    /// private/reserved range.
    pub fn allow_loopback(mut self) -> Self {
        if self.address_policy == AddressPolicy::Public {
            self.address_policy = AddressPolicy::PublicAndLoopback;
        }
        self
    }

    fn classify(&self, e: reqwest::Error) -> AppError {
        let error = if e.is_timeout() {
            AppError::upstream(
                UpstreamReason::Timeout,
                format!("Website did not respond within {} seconds", self.timeout_secs),
            )
        } else if e.is_connect() {
            AppError::upstream(UpstreamReason::Network, format!("Connection failed: {e}"))
        } else {
            AppError::upstream(UpstreamReason::Network, e.to_string())
        };
        tracing::warn!(error = %error, "Website fetch failed");
        error
    }

    /// Sends the request, following redirects manually so every hop passes
    /// the address check.
    async fn send(&self, url: &str) -> Result<Response, AppError> {
        let mut current =
            Url::parse(url).map_err(|e| AppError::InvalidInput(format!("Invalid URL: {e}")))?;

        for _ in 0..=MAX_REDIRECTS {
            validate_url(&current, self.address_policy).await?;

            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            if !status.is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    AppError::upstream(
                        UpstreamReason::HttpStatus,
                        format!("HTTP {} without a Location header for {current}", status.as_u16()),
                    )
                })?;
            let next = current.join(location).map_err(|e| {
                AppError::upstream(
                    UpstreamReason::HttpStatus,
                    format!("Invalid redirect target '{location}' from {current}: {e}"),
                )
            })?;

            tracing::debug!(from = %current, to = %next, "Following redirect");
            current = next;
        }

        Err(AppError::upstream(
            UpstreamReason::HttpStatus,
            format!("More than {MAX_REDIRECTS} redirects fetching {url}"),
        ))
    }

    fn too_large(&self, size: impl std::fmt::Display) -> AppError {
        AppError::upstream(
            UpstreamReason::UnusableContent,
            format!("Page is {size} bytes, limit is {}", self.max_body_bytes),
        )
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AppError> {
        let mut response = self.send(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                UpstreamReason::HttpStatus,
                format!("HTTP {} for {}", status.as_u16(), response.url()),
            ));
        }

        if let Some(length) = response.content_length()
            && length as usize > self.max_body_bytes
        {
            return Err(self.too_large(length));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        // Content-Length may be absent, so the cap is enforced while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(format!("more than {}", self.max_body_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            url: final_url,
            body: String::from_utf8_lossy(&body).into_owned(),
            content_type,
        })
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is blocked by `policy`.
async fn validate_url(url: &Url, policy: AddressPolicy) -> Result<(), AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::InvalidInput(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }
    if policy == AddressPolicy::Any {
        return Ok(());
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::InvalidInput("URL has no host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if policy.blocks(ip) {
            tracing::warn!(%url, "Blocked request to private address");
            return Err(AppError::InvalidInput(format!(
                "SSRF blocked: {host} is a private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| {
            AppError::upstream(
                UpstreamReason::Network,
                format!("DNS resolution failed for {host}: {e}"),
            )
        })?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::upstream(
            UpstreamReason::Network,
            format!("DNS resolution returned no addresses for {host}"),
        ));
    }

    if let Some(blocked) = addrs.iter().find(|a| policy.blocks(a.ip())) {
        tracing::warn!(%url, ip = %blocked.ip(), "Blocked request to private address");
        return Err(AppError::InvalidInput(format!(
            "SSRF blocked: {host} resolves to private/reserved IP {}",
            blocked.ip()
        )));
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // includes cloud metadata 169.254.169.254
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || (a == 100 && (b & 0xC0) == 64) // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFFC0) == 0xFE80 // fe80::/10
                || (first & 0xFE00) == 0xFC00 // fc00::/7
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}
