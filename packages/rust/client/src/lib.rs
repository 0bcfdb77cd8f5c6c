//! HTTP client for the company profile lookup API.
//!
//! One POST per company: the profile URL goes out as `{"link": ...}` and the
//! JSON answer is mapped to a flat [`EnrichedRecord`]. There is no caching
//! and no retry; failures are reported as [`EnricherError::Transport`] or
//! [`EnricherError::Decode`] so the caller can skip the row.

mod response;

use enricher_shared::{ApiConfig, EnrichedRecord, EnricherError, Result};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

pub use response::parse_profile;
use response::ProfileRequest;

/// User-Agent string for profile requests.
const USER_AGENT: &str = concat!("company-enricher/", env!("CARGO_PKG_VERSION"));

/// Header naming the API host on RapidAPI-style gateways.
const HOST_HEADER: &str = "x-rapidapi-host";

// ---------------------------------------------------------------------------
// ProfileClient
// ---------------------------------------------------------------------------

/// Authenticated client for a single profile endpoint.
#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: Client,
    endpoint: Url,
}

impl ProfileClient {
    /// Build a client from the `[api]` config and an already resolved key.
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let http = build_client(config, api_key)?;
        Ok(Self { http, endpoint })
    }

    /// The endpoint every lookup is sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Look up one company profile.
    ///
    /// Returns `Ok(None)` when the API has no meaningful data for the profile.
    #[instrument(skip(self))]
    pub async fn enrich(&self, profile_url: &str) -> Result<Option<EnrichedRecord>> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&ProfileRequest { link: profile_url })
            .send()
            .await
            .map_err(|e| EnricherError::Transport(format!("{profile_url}: {e}")))?;

        let status = response.status();
        debug!(%status, "profile API responded");
        if !status.is_success() {
            return Err(EnricherError::Transport(format!(
                "{profile_url}: HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            EnricherError::Transport(format!("{profile_url}: failed to read body: {e}"))
        })?;

        parse_profile(&body)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client that sends the auth headers on every request.
fn build_client(config: &ApiConfig, api_key: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();

    let key_header = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
        EnricherError::config(format!(
            "invalid api.api_key_header {:?}: {e}",
            config.api_key_header
        ))
    })?;
    let mut key_value = HeaderValue::from_str(api_key)
        .map_err(|e| EnricherError::config(format!("API key is not a valid header value: {e}")))?;
    key_value.set_sensitive(true);
    headers.insert(key_header, key_value);

    if let Some(host) = &config.host {
        let host_value = HeaderValue::from_str(host)
            .map_err(|e| EnricherError::config(format!("invalid api.host {host:?}: {e}")))?;
        headers.insert(HeaderName::from_static(HOST_HEADER), host_value);
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| EnricherError::Transport(format!("failed to build HTTP client: {e}")))
}
