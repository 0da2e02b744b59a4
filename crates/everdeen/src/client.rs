//! HTTP client for the proxy's control API.

use crate::error::{Error, Result};
use crate::model::{
    CapturedRequest, CreateExpectationsRequest, Expectation, RequestCriteria, RequestsEnvelope,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Reply of a healthy control server to `GET /ping`.
pub const PONG: &str = "PONG";

/// Body of `POST /requests`.
#[derive(Debug, Serialize)]
struct FindRequestsRequest<'a> {
    request_criteria: &'a RequestCriteria,
}

/// Client for the control API of a running proxy.
///
/// Calls are never retried. A refused connection surfaces as
/// [`Error::Connection`] so callers that poll during startup can tell it apart
/// from real failures.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
    base_url: String,
}

impl ControlClient {
    /// Client for `base_url` (e.g. `http://127.0.0.1:4322`) with reqwest defaults.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Client reusing a configured `reqwest::Client`, e.g. one with a timeout.
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Health probe. A ready server answers [`PONG`].
    pub async fn ping(&self) -> Result<String> {
        let url = self.url("/ping");
        let resp = self.send(self.client.get(&url), &url).await?;
        Ok(resp.text().await?)
    }

    /// Every expectation the server currently holds.
    pub async fn list_expectations(&self) -> Result<Vec<Expectation>> {
        let url = self.url("/expectations");
        let resp = self.send(self.client.get(&url), &url).await?;
        read_json(resp, &url).await
    }

    /// Register `expectations` and return them as the server stored them,
    /// including the assigned uuids.
    ///
    /// Not idempotent: sending the same expectation twice registers it twice.
    pub async fn register_expectations(
        &self,
        expectations: &[Expectation],
    ) -> Result<Vec<Expectation>> {
        let url = self.url("/expectations");
        let body = CreateExpectationsRequest { expectations };
        let resp = self.send(self.client.post(&url).json(&body), &url).await?;
        let registered: Vec<Expectation> = read_json(resp, &url).await?;
        debug!(count = registered.len(), "registered expectations");
        Ok(registered)
    }

    /// Requests stored for the expectation `uuid`.
    pub async fn list_requests(&self, uuid: Uuid) -> Result<Vec<CapturedRequest>> {
        let url = self.url(&format!("/expectations/{uuid}/requests"));
        let resp = self.send(self.client.get(&url), &url).await?;
        let envelope: RequestsEnvelope = read_json(resp, &url).await?;
        Ok(envelope.requests)
    }

    /// Search every stored request with ad-hoc criteria.
    pub async fn find_requests(&self, criteria: &RequestCriteria) -> Result<Vec<CapturedRequest>> {
        let url = self.url("/requests");
        let body = FindRequestsRequest {
            request_criteria: criteria,
        };
        let resp = self.send(self.client.post(&url).json(&body), &url).await?;
        let envelope: RequestsEnvelope = read_json(resp, &url).await?;
        Ok(envelope.requests)
    }

    /// Drop all expectations and stored requests. Safe to call on an empty server.
    pub async fn reset_all(&self) -> Result<()> {
        let url = self.url("/reset/all");
        self.send(self.client.delete(&url), &url).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, mapping refused connections and non-2xx statuses.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<reqwest::Response> {
        debug!("Control API request: {}", url);

        let resp = request.send().await.map_err(|e| {
            if e.is_connect() {
                Error::Connection {
                    url: url.to_string(),
                    source: e,
                }
            } else {
                Error::Request(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(resp)
    }
}

/// Parse a JSON body, reporting malformed payloads as [`Error::Protocol`].
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        Error::protocol(url, format!("{e} in body {}", truncate(&body, 200)))
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
