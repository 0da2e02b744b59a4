//! Requests the proxy stored for an expectation.

use super::response::Headers;
use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

/// A real request the proxy observed and matched.
///
/// Two captured requests are equal when url, method, headers and body are all equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRequest {
    url: String,
    method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    headers: Headers,
    #[serde(default)]
    body_base64: String,
}

impl CapturedRequest {
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        headers: Headers,
        body_base64: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers,
            body_base64: body_base64.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn body_base64(&self) -> &str {
        &self.body_base64
    }

    /// Decoded body bytes.
    pub fn body(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.body_base64)?)
    }

    /// Decoded body as text; invalid UTF-8 is replaced.
    pub fn body_text(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.body()?).into_owned())
    }
}

// Go-style servers encode a nil header map as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Headers, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Headers>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{"requests": [...]}` envelope returned by the request endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct RequestsEnvelope {
    #[serde(default)]
    pub requests: Vec<CapturedRequest>,
}
