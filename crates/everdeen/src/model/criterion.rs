//! A single match rule.

use super::descriptor::Descriptor;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which part of the request a criterion looks at.
///
/// Names the proxy does not know yet are kept verbatim in [`CriterionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CriterionType {
    Method,
    Host,
    Path,
    Url,
    Header,
    Body,
    QueryParam,
    Other(String),
}

impl CriterionType {
    pub fn as_str(&self) -> &str {
        match self {
            CriterionType::Method => "method",
            CriterionType::Host => "host",
            CriterionType::Path => "path",
            CriterionType::Url => "url",
            CriterionType::Header => "header",
            CriterionType::Body => "body",
            CriterionType::QueryParam => "query_param",
            CriterionType::Other(name) => name,
        }
    }
}

impl From<&str> for CriterionType {
    fn from(name: &str) -> Self {
        match name {
            "method" => CriterionType::Method,
            "host" => CriterionType::Host,
            "path" => CriterionType::Path,
            "url" => CriterionType::Url,
            "header" => CriterionType::Header,
            "body" => CriterionType::Body,
            "query_param" => CriterionType::QueryParam,
            other => CriterionType::Other(other.to_string()),
        }
    }
}

impl From<String> for CriterionType {
    fn from(name: String) -> Self {
        CriterionType::from(name.as_str())
    }
}

impl From<CriterionType> for String {
    fn from(kind: CriterionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CriterionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison strategy. Interpreted by the proxy, never by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum MatchType {
    #[default]
    Exact,
    Regex,
    Fuzzy,
    Other(String),
}

impl MatchType {
    pub fn as_str(&self) -> &str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Regex => "regex",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Other(name) => name,
        }
    }
}

impl From<&str> for MatchType {
    fn from(name: &str) -> Self {
        match name {
            "exact" => MatchType::Exact,
            "regex" => MatchType::Regex,
            "fuzzy" => MatchType::Fuzzy,
            other => MatchType::Other(other.to_string()),
        }
    }
}

// The server echoes "" for criteria registered without a match type.
impl From<Option<String>> for MatchType {
    fn from(name: Option<String>) -> Self {
        match name.as_deref() {
            None | Some("") => MatchType::Exact,
            Some(name) => MatchType::from(name),
        }
    }
}

impl From<MatchType> for String {
    fn from(match_type: MatchType) -> Self {
        match_type.as_str().to_string()
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic match rule: field, comparison and expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CriterionWire", into = "CriterionWire")]
pub struct Criterion {
    key: Option<String>,
    match_type: MatchType,
    kind: CriterionType,
    value: Value,
}

/// Wire shape. `values` replaces `value` for multi-valued query parameters.
#[derive(Debug, Serialize, Deserialize)]
struct CriterionWire {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    match_type: MatchType,
    #[serde(rename = "type")]
    kind: CriterionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Value>>,
}

impl From<Criterion> for CriterionWire {
    fn from(c: Criterion) -> Self {
        match (c.kind, c.value) {
            (CriterionType::QueryParam, Value::Array(values)) => CriterionWire {
                key: c.key,
                match_type: c.match_type,
                kind: CriterionType::QueryParam,
                value: None,
                values: Some(values),
            },
            (kind, value) => CriterionWire {
                key: c.key,
                match_type: c.match_type,
                kind,
                value: Some(value),
                values: None,
            },
        }
    }
}

impl From<CriterionWire> for Criterion {
    fn from(wire: CriterionWire) -> Self {
        let value = match (wire.values, wire.value) {
            (Some(values), _) => Value::Array(values),
            (None, value) => value.unwrap_or(Value::Null),
        };
        // The server serializes an unset key as "".
        let key = wire.key.filter(|k| !k.is_empty());
        Criterion {
            key,
            match_type: wire.match_type,
            kind: wire.kind,
            value,
        }
    }
}

impl Criterion {
    const FIELDS: [&'static str; 4] = ["key", "match_type", "type", "value"];

    /// Criterion on `kind` expecting `value`, compared exactly.
    pub fn new(kind: impl Into<CriterionType>, value: impl Into<Value>) -> Self {
        Self {
            key: None,
            match_type: MatchType::Exact,
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// `method == value`.
    pub fn method(value: impl Into<String>) -> Self {
        Self::new(CriterionType::Method, value.into())
    }

    /// Header `name` compared against `value`.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(CriterionType::Header, value.into()).with_key(name)
    }

    /// Query parameter `name` carrying exactly `values`.
    pub fn query_params<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect::<Vec<_>>();
        Self::new(CriterionType::QueryParam, Value::Array(values)).with_key(name)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_match_type(mut self, match_type: impl Into<MatchType>) -> Self {
        self.match_type = match_type.into();
        self
    }

    /// Build from a `{key, match_type, type, value}` map.
    ///
    /// `type` is required; unknown keys are rejected.
    pub fn from_descriptor(descriptor: &Value) -> Result<Self> {
        let d = Descriptor::parse(descriptor, "criterion", &Self::FIELDS)?;
        let kind = d
            .string("type")?
            .ok_or_else(|| Error::invalid(format!("criterion is missing `type`: {descriptor}")))?;

        Ok(Self {
            key: d.string("key")?,
            match_type: d
                .string("match_type")?
                .map(|m| MatchType::from(m.as_str()))
                .unwrap_or_default(),
            kind: CriterionType::from(kind),
            value: d.get_raw("value").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn match_type(&self) -> &MatchType {
        &self.match_type
    }

    pub fn kind(&self) -> &CriterionType {
        &self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the wire form carries `values` instead of `value`.
    pub fn is_multi_valued(&self) -> bool {
        self.kind == CriterionType::QueryParam && self.value.is_array()
    }

    /// JSON wire form.
    pub fn to_wire(&self) -> Value {
        serde_json::to_value(CriterionWire::from(self.clone())).unwrap_or(Value::Null)
    }
}
