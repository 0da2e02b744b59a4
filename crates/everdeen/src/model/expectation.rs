//! The unit registered with the proxy: criteria, canned response and policy.

use super::criterion::Criterion;
use super::descriptor::{clamp_max_matches, effective_max_matches, present_as_flag, Descriptor};
use super::request_criteria::RequestCriteria;
use super::response::Response;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A match rule plus what to do when it matches.
///
/// Built locally, then sent to the control server, which assigns the `uuid`.
/// Values returned by the server are read-only snapshots of its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    store_matching_requests: bool,
    #[serde(default = "one")]
    max_matches: u32,
    #[serde(default)]
    pass_through: bool,
    #[serde(default)]
    request_criteria: RequestCriteria,
    #[serde(rename = "respond_with", default)]
    response: Response,
    #[serde(default, skip_serializing)]
    uuid: Option<Uuid>,
    #[serde(default, skip_serializing)]
    matches: Option<u32>,
}

fn one() -> u32 {
    1
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            store_matching_requests: false,
            max_matches: 1,
            pass_through: false,
            request_criteria: RequestCriteria::default(),
            response: Response::default(),
            uuid: None,
            matches: None,
        }
    }
}

impl Expectation {
    const FIELDS: [&'static str; 5] = [
        "store_matching_requests",
        "max_matches",
        "pass_through",
        "request_criteria",
        "response",
    ];

    pub fn builder() -> ExpectationBuilder {
        ExpectationBuilder::default()
    }

    /// Build from a descriptor map with the keys `store_matching_requests`,
    /// `max_matches`, `pass_through`, `request_criteria` and `response`.
    ///
    /// The two flags use [`present_as_flag`]: `{"pass_through": false}` turns
    /// pass-through *on*.
    pub fn from_descriptor(descriptor: &Value) -> Result<Self> {
        let d = Descriptor::parse(descriptor, "expectation", &Self::FIELDS)?;

        Ok(Self {
            store_matching_requests: present_as_flag(d.get_raw("store_matching_requests")),
            max_matches: effective_max_matches(d.get("max_matches")),
            pass_through: present_as_flag(d.get_raw("pass_through")),
            request_criteria: RequestCriteria::from_descriptor(d.get("request_criteria"))?,
            response: Response::from_descriptor(d.get("response"))?,
            uuid: None,
            matches: None,
        })
    }

    pub fn store_matching_requests(&self) -> bool {
        self.store_matching_requests
    }

    pub fn max_matches(&self) -> u32 {
        self.max_matches
    }

    pub fn pass_through(&self) -> bool {
        self.pass_through
    }

    pub fn request_criteria(&self) -> &RequestCriteria {
        &self.request_criteria
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Server-assigned id; `None` until registered.
    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid.filter(|id| !id.is_nil())
    }

    /// How often the server has matched this expectation, when it reported it.
    pub fn matches(&self) -> Option<u32> {
        self.matches
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Typed counterpart of [`Expectation::from_descriptor`].
#[derive(Debug, Clone, Default)]
pub struct ExpectationBuilder {
    store_matching_requests: bool,
    max_matches: Option<i64>,
    pass_through: bool,
    request_criteria: RequestCriteria,
    response: Response,
}

impl ExpectationBuilder {
    /// Keep the requests that match so they can be listed later.
    pub fn store_matching_requests(mut self, store: bool) -> Self {
        self.store_matching_requests = store;
        self
    }

    /// Cap on matches; zero or negative means 1.
    pub fn max_matches(mut self, max_matches: i64) -> Self {
        self.max_matches = Some(max_matches);
        self
    }

    /// Forward matching requests upstream instead of answering them.
    pub fn pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = pass_through;
        self
    }

    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.request_criteria.push(criterion);
        self
    }

    pub fn request_criteria(mut self, criteria: RequestCriteria) -> Self {
        self.request_criteria = criteria;
        self
    }

    pub fn respond_with(mut self, response: Response) -> Self {
        self.response = response;
        self
    }

    pub fn build(self) -> Expectation {
        Expectation {
            store_matching_requests: self.store_matching_requests,
            max_matches: clamp_max_matches(self.max_matches.unwrap_or(0)),
            pass_through: self.pass_through,
            request_criteria: self.request_criteria,
            response: self.response,
            uuid: None,
            matches: None,
        }
    }
}

/// `{"expectations": [...]}` body of `POST /expectations`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateExpectationsRequest<'a> {
    pub expectations: &'a [Expectation],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriterionType, MatchType};
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_max_matches_defaults_to_one() {
        assert_eq!(Expectation::builder().build().max_matches(), 1);
        assert_eq!(Expectation::builder().max_matches(0).build().max_matches(), 1);
        assert_eq!(Expectation::builder().max_matches(-2).build().max_matches(), 1);
        assert_eq!(Expectation::builder().max_matches(3).build().max_matches(), 3);

        let e = Expectation::from_descriptor(&json!({"max_matches": null})).unwrap();
        assert_eq!(e.max_matches(), 1);
        let e = Expectation::from_descriptor(&json!({"max_matches": 3})).unwrap();
        assert_eq!(e.max_matches(), 3);
    }

    #[test]
    fn test_flags_use_truthy_coercion() {
        let e = Expectation::from_descriptor(&json!({})).unwrap();
        assert!(!e.pass_through());
        assert!(!e.store_matching_requests());

        let e = Expectation::from_descriptor(&json!({
            "pass_through": null,
            "store_matching_requests": null
        }))
        .unwrap();
        assert!(!e.pass_through());
        assert!(!e.store_matching_requests());

        let e = Expectation::from_descriptor(&json!({
            "pass_through": "not nil but not true either",
            "store_matching_requests": "false"
        }))
        .unwrap();
        assert!(e.pass_through());
        assert!(e.store_matching_requests());

        let e = Expectation::from_descriptor(&json!({"pass_through": false})).unwrap();
        assert!(e.pass_through());
    }

    #[test]
    fn test_criteria_and_response_always_present() {
        let e = Expectation::from_descriptor(&json!({})).unwrap();
        assert_eq!(
            e.to_wire(),
            json!({
                "store_matching_requests": false,
                "max_matches": 1,
                "pass_through": false,
                "request_criteria": [],
                "respond_with": {"status": null, "headers": null, "body": null, "body_encoding": ""}
            })
        );
    }

    #[test]
    fn test_descriptor_builds_nested_values() {
        let e = Expectation::from_descriptor(&json!({
            "max_matches": 3,
            "request_criteria": {"type": "method", "value": "GET"},
            "response": {"status": 200, "body": "Hello World"}
        }))
        .unwrap();

        assert_eq!(e.request_criteria().len(), 1);
        assert_eq!(e.response().status(), Some(200));
        assert_eq!(e.response().body(), &json!("Hello World"));
        assert_eq!(
            e.to_wire(),
            json!({
                "store_matching_requests": false,
                "max_matches": 3,
                "pass_through": false,
                "request_criteria": [
                    {"key": null, "match_type": "exact", "type": "method", "value": "GET"}
                ],
                "respond_with": {
                    "status": 200,
                    "headers": null,
                    "body": "Hello World",
                    "body_encoding": ""
                }
            })
        );
    }

    #[test]
    fn test_descriptor_rejects_unknown_keys() {
        let err = Expectation::from_descriptor(&json!({"respond_with": {}})).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_builder_matches_descriptor() {
        let built = Expectation::builder()
            .store_matching_requests(true)
            .criterion(Criterion::method("POST"))
            .respond_with(Response::text(200, "Hello World"))
            .build();
        let described = Expectation::from_descriptor(&json!({
            "store_matching_requests": true,
            "request_criteria": [{"type": "method", "value": "POST"}],
            "response": {"status": 200, "body": "Hello World"}
        }))
        .unwrap();
        assert_eq!(built, described);
    }

    #[test]
    fn test_round_trip_through_server_echo() {
        let original = Expectation::builder()
            .store_matching_requests(true)
            .max_matches(4)
            .pass_through(true)
            .criterion(Criterion::header("Host", "example.com").with_match_type("regex"))
            .criterion(Criterion::query_params("tag", ["a", "b"]))
            .build();

        let mut echoed = original.to_wire();
        echoed["uuid"] = json!("6f1c0a52-8a3c-4c1e-9f53-2a4d3b7e1a10");
        echoed["matches"] = json!(0);
        let parsed: Expectation = serde_json::from_value(echoed).unwrap();

        assert_eq!(parsed.max_matches(), 4);
        assert!(parsed.pass_through());
        assert!(parsed.store_matching_requests());
        assert_eq!(parsed.request_criteria(), original.request_criteria());
        assert_eq!(parsed.matches(), Some(0));
        assert!(parsed.uuid().is_some());

        let header = &parsed.request_criteria().criteria()[0];
        assert_eq!(header.kind(), &CriterionType::Header);
        assert_eq!(header.key(), Some("Host"));
        assert_eq!(header.match_type(), &MatchType::Regex);
    }

    #[test]
    fn test_nil_uuid_means_unregistered() {
        let mut echoed = Expectation::default().to_wire();
        echoed["uuid"] = json!("00000000-0000-0000-0000-000000000000");
        let parsed: Expectation = serde_json::from_value(echoed).unwrap();
        assert_eq!(parsed.uuid(), None);
    }

    #[test]
    fn test_create_request_body() {
        let expectations = vec![Expectation::default()];
        let body = serde_json::to_value(CreateExpectationsRequest {
            expectations: &expectations,
        })
        .unwrap();
        assert_eq!(body["expectations"].as_array().unwrap().len(), 1);
    }
}
