//! Canned response template.

use super::descriptor::Descriptor;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Header name to values. Ordered so the wire form is stable.
pub type Headers = BTreeMap<String, Vec<String>>;

/// How the proxy must treat `body` before sending it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum BodyEncoding {
    /// Literal text, sent as is. Serialized as `""`.
    #[default]
    None,
    Base64,
    Other(String),
}

impl BodyEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            BodyEncoding::None => "",
            BodyEncoding::Base64 => "base64",
            BodyEncoding::Other(name) => name,
        }
    }
}

impl From<&str> for BodyEncoding {
    fn from(name: &str) -> Self {
        match name {
            "" => BodyEncoding::None,
            "base64" => BodyEncoding::Base64,
            other => BodyEncoding::Other(other.to_string()),
        }
    }
}

impl From<Option<String>> for BodyEncoding {
    fn from(name: Option<String>) -> Self {
        name.as_deref().map(BodyEncoding::from).unwrap_or_default()
    }
}

impl From<BodyEncoding> for String {
    fn from(encoding: BodyEncoding) -> Self {
        encoding.as_str().to_string()
    }
}

impl fmt::Display for BodyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response the proxy sends when an expectation matches.
///
/// Every field is emitted on the wire; unset ones are explicit `null`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default, deserialize_with = "deserialize_headers")]
    headers: Option<Headers>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    body_encoding: BodyEncoding,
}

impl Response {
    const FIELDS: [&'static str; 4] = ["status", "headers", "body", "body_encoding"];

    pub fn new() -> Self {
        Self::default()
    }

    /// `status` with a literal text body.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new().with_status(status).with_body(body.into())
    }

    /// Binary body, base64 encoded for transport.
    pub fn base64_body(status: u16, body: impl AsRef<[u8]>) -> Self {
        Self::new()
            .with_status(status)
            .with_body(STANDARD.encode(body))
            .with_body_encoding(BodyEncoding::Base64)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add one value for `name`, keeping any existing ones.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_body_encoding(mut self, encoding: impl Into<BodyEncoding>) -> Self {
        self.body_encoding = encoding.into();
        self
    }

    /// Build from a `{status, headers, body, body_encoding}` map, or `null`
    /// for an empty template.
    pub fn from_descriptor(descriptor: Option<&Value>) -> Result<Self> {
        let Some(descriptor) = descriptor.filter(|d| !d.is_null()) else {
            return Ok(Self::default());
        };
        let d = Descriptor::parse(descriptor, "response", &Self::FIELDS)?;

        let status = match d.get("status") {
            None => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|s| u16::try_from(s).ok())
                    .ok_or_else(|| Error::invalid(format!("response.status must be an HTTP status, got {v}")))?,
            ),
        };
        let headers = match d.get("headers") {
            None => None,
            Some(v) => Some(
                serde_json::from_value::<HeaderInput>(v.clone())
                    .map_err(|e| Error::invalid(format!("response.headers: {e}")))?
                    .into_headers(),
            ),
        };

        Ok(Self {
            status,
            headers,
            body: d.get_raw("body").cloned().unwrap_or(Value::Null),
            body_encoding: BodyEncoding::from(d.string("body_encoding")?),
        })
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn body_encoding(&self) -> &BodyEncoding {
        &self.body_encoding
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Header values as written by people and by older servers: one string or many.
#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(transparent)]
struct HeaderInput(BTreeMap<String, HeaderValues>);

impl HeaderInput {
    fn into_headers(self) -> Headers {
        self.0
            .into_iter()
            .map(|(name, values)| match values {
                HeaderValues::One(v) => (name, vec![v]),
                HeaderValues::Many(vs) => (name, vs),
            })
            .collect()
    }
}

fn deserialize_headers<'de, D>(deserializer: D) -> std::result::Result<Option<Headers>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HeaderInput>::deserialize(deserializer)?.map(HeaderInput::into_headers))
}
