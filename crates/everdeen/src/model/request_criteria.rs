//! Ordered, append-only list of criteria.

use super::criterion::Criterion;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The criteria an expectation matches on, in registration order.
///
/// How the criteria combine (all-of or any-of) is decided by the proxy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestCriteria {
    criteria: Vec<Criterion>,
}

impl RequestCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of criterion maps, a single map, or `null`.
    pub fn from_descriptor(descriptor: Option<&Value>) -> Result<Self> {
        let mut criteria = Self::new();
        match descriptor {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    criteria.add(item)?;
                }
            }
            Some(item @ Value::Object(_)) => {
                criteria.add(item)?;
            }
            Some(other) => {
                return Err(Error::invalid(format!(
                    "request_criteria must be a list or a map, got {other}"
                )))
            }
        }
        Ok(criteria)
    }

    /// Append one criterion built from a descriptor map.
    pub fn add(&mut self, descriptor: &Value) -> Result<&mut Self> {
        self.criteria.push(Criterion::from_descriptor(descriptor)?);
        Ok(self)
    }

    /// Append an already built criterion.
    pub fn push(&mut self, criterion: Criterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Criterion> {
        self.criteria.iter()
    }

    pub fn to_wire(&self) -> Value {
        Value::Array(self.criteria.iter().map(Criterion::to_wire).collect())
    }
}

impl FromIterator<Criterion> for RequestCriteria {
    fn from_iter<T: IntoIterator<Item = Criterion>>(iter: T) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RequestCriteria {
    type Item = &'a Criterion;
    type IntoIter = std::slice::Iter<'a, Criterion>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_yields_empty_list() {
        assert_eq!(RequestCriteria::from_descriptor(None).unwrap().to_wire(), json!([]));
        assert_eq!(
            RequestCriteria::from_descriptor(Some(&Value::Null))
                .unwrap()
                .to_wire(),
            json!([])
        );
        assert_eq!(
            RequestCriteria::from_descriptor(Some(&json!([])))
                .unwrap()
                .to_wire(),
            json!([])
        );
    }

    #[test]
    fn test_add_appends_criterion() {
        let mut criteria = RequestCriteria::new();
        criteria.add(&json!({"type": "method", "value": "POST"})).unwrap();
        assert_eq!(criteria.len(), 1);
    }

    #[test]
    fn test_single_map_is_one_criterion() {
        let criteria =
            RequestCriteria::from_descriptor(Some(&json!({"type": "method", "value": "GET"})))
                .unwrap();
        assert_eq!(criteria.len(), 1);
    }

    #[test]
    fn test_to_wire_keeps_order_and_defaults() {
        let criteria = RequestCriteria::from_descriptor(Some(&json!([
            {"type": "method", "value": "POST"},
            {"key": "Host", "type": "header", "value": "example.com", "match_type": "exact"}
        ])))
        .unwrap();

        assert_eq!(
            criteria.to_wire(),
            json!([
                {"key": null, "match_type": "exact", "type": "method", "value": "POST"},
                {"key": "Host", "match_type": "exact", "type": "header", "value": "example.com"}
            ])
        );
    }

    #[test]
    fn test_scalar_descriptor_is_rejected() {
        assert!(RequestCriteria::from_descriptor(Some(&json!("GET"))).is_err());
    }

    #[test]
    fn test_bad_item_fails_whole_list() {
        let result = RequestCriteria::from_descriptor(Some(&json!([
            {"type": "method", "value": "POST"},
            {"type": "method", "bogus": true}
        ])));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
