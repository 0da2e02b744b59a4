//! Loosely-typed input maps and the coercions applied to them.
//!
//! Harnesses often describe expectations as plain JSON/YAML maps. Every model
//! type has an explicit `from_descriptor` constructor that enumerates the keys
//! it understands; any other key is rejected with [`Error::InvalidArgument`].

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// A descriptor map whose keys have been checked against a whitelist.
pub(crate) struct Descriptor<'a> {
    kind: &'static str,
    fields: &'a Map<String, Value>,
}

impl<'a> Descriptor<'a> {
    /// Accept `value` if it is a map containing only `allowed` keys.
    pub(crate) fn parse(
        value: &'a Value,
        kind: &'static str,
        allowed: &[&str],
    ) -> Result<Self> {
        let fields = value
            .as_object()
            .ok_or_else(|| Error::invalid(format!("{kind} descriptor must be a map, got {value}")))?;

        let mut unknown: Vec<&str> = fields
            .keys()
            .map(String::as_str)
            .filter(|k| !allowed.contains(k))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(Error::invalid(format!(
                "unknown {kind} field(s): {} (expected one of: {})",
                unknown.join(", "),
                allowed.join(", ")
            )));
        }

        Ok(Self { kind, fields })
    }

    /// Raw value of a field; `null` is reported as absent.
    pub(crate) fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    /// Raw value of a field, keeping an explicit `null`.
    pub(crate) fn get_raw(&self, name: &str) -> Option<&'a Value> {
        self.fields.get(name)
    }

    /// A field that must be a string when present.
    ///
    /// Symbols serialized by other tooling arrive as plain strings, so only
    /// strings are accepted.
    pub(crate) fn string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Error::invalid(format!(
                "{}.{name} must be a string, got {other}",
                self.kind
            ))),
        }
    }
}

/// Truthy coercion used for `pass_through` and `store_matching_requests`.
///
/// Any value that is present and not `null` counts as `true`, including JSON
/// `false`, `0` and the string `"false"`. This is not boolean parsing: existing
/// harnesses depend on presence alone switching the flag on.
pub fn present_as_flag(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// Coerce a `max_matches` input to an effective cap.
///
/// Integers and integer strings are read; anything absent, non-positive or
/// unparsable yields 1.
pub fn effective_max_matches(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };
    clamp_max_matches(parsed.unwrap_or(0))
}

pub(crate) fn clamp_max_matches(n: i64) -> u32 {
    if n <= 0 {
        1
    } else {
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

// "12abc" reads as 12, "abc" as nothing.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}
