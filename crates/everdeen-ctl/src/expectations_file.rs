//! Expectation files: YAML or JSON, either a bare list of descriptors or a
//! map with an `expectations` list.

use anyhow::{bail, Context, Result};
use everdeen::Expectation;
use serde_json::Value;
use std::path::Path;

pub fn load(path: &Path) -> Result<Vec<Expectation>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    parse(&contents, is_json).with_context(|| format!("Invalid expectations file {}", path.display()))
}

pub fn parse(contents: &str, is_json: bool) -> Result<Vec<Expectation>> {
    let document: Value = if is_json {
        serde_json::from_str(contents)?
    } else {
        serde_yaml::from_str(contents)?
    };

    let descriptors = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("expectations") {
            Some(Value::Array(items)) => items,
            Some(other) => bail!("`expectations` must be a list, got {other}"),
            None => bail!("expected a list of expectations or an `expectations` key"),
        },
        Value::Null => Vec::new(),
        other => bail!("expected a list of expectations, got {other}"),
    };

    descriptors
        .iter()
        .enumerate()
        .map(|(i, descriptor)| {
            Expectation::from_descriptor(descriptor).with_context(|| format!("expectation #{}", i + 1))
        })
        .collect()
}
