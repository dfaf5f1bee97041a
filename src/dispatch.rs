//! Outbound request dispatch
//!
//! One shared `reqwest::Client` is injected at construction and reused
//! across all in-flight calls; the dispatcher itself holds no per-call
//! state. Credentials are attached here and NEVER logged or echoed in
//! error payloads.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// Value advertised to upstreams for content negotiation
const ACCEPT_JSON: &str = "application/json,application/problem+json";

/// HTTP verbs in the upstream contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    /// Query parameters allowed, no body
    #[default]
    Get,
    /// JSON body, no query parameters
    Post,
    /// No body, no query parameters
    Delete,
}

impl Verb {
    /// Canonical uppercase method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for Verb {
    type Err = Error;

    /// Fail-fast gate for data-driven rule sources: anything outside the
    /// three supported verbs is a caller contract violation, caught
    /// before any network I/O.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::UnsupportedVerb(other.to_string())),
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient request descriptor, created per invocation and consumed once
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    /// HTTP verb
    pub verb: Verb,
    /// Resolved upstream path (placeholders already substituted)
    pub path: String,
    /// JSON body (POST only)
    pub body: Option<Value>,
    /// Query parameters (GET only)
    pub query: Vec<(String, String)>,
}

/// Raw upstream response before normalization
#[derive(Debug)]
pub struct RawResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response body decoded as text
    pub body: String,
    /// Final request URL
    pub url: String,
}

/// Issues outbound CAMARA calls with fixed headers and a per-call timeout
pub struct Dispatcher {
    client: Client,
    base_url: String,
    credential: String,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher around a shared HTTP client
    #[must_use]
    pub fn new(client: Client, base_url: &str, credential: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            timeout,
        }
    }

    /// Send one request and collect the raw response
    ///
    /// Transport-level failures (connect, DNS, timeout) surface as
    /// [`Error::Network`]; HTTP status handling is the normalizer's job.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, descriptor.path);
        let correlator = Uuid::new_v4().to_string();

        debug!(verb = %descriptor.verb, url = %url, correlator = %correlator, "Upstream call");

        let mut request = match descriptor.verb {
            Verb::Get => self.client.get(&url).query(&descriptor.query),
            Verb::Post => {
                let body = descriptor.body.as_ref().cloned().unwrap_or(Value::Null);
                self.client.post(&url).json(&body)
            }
            Verb::Delete => self.client.delete(&url),
        };

        let auth = HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|_| Error::Config("Invalid credential format".to_string()))?;
        request = request
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, ACCEPT_JSON)
            .header("x-correlator", correlator.as_str())
            .timeout(self.timeout);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("Request timed out after {:?}", self.timeout))
            } else {
                Error::Network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {e}")))?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            correlator = %correlator,
            "Upstream response"
        );

        Ok(RawResponse {
            status,
            body,
            url: final_url,
        })
    }
}
