//! Expectation data model and its JSON wire form.
//!
//! - [`Criterion`] / [`RequestCriteria`]: what a request must look like
//! - [`Response`]: what the proxy answers
//! - [`Expectation`]: criteria + response + matching policy
//! - [`CapturedRequest`]: a request the proxy stored for an expectation
//!
//! Each type can be built with typed constructors or from a loosely-typed
//! descriptor map (`from_descriptor`), and renders its wire form with `to_wire`.

mod captured;
mod criterion;
mod descriptor;
mod expectation;
mod request_criteria;
mod response;

pub use captured::CapturedRequest;
pub use criterion::{Criterion, CriterionType, MatchType};
pub use descriptor::{effective_max_matches, present_as_flag};
pub use expectation::{Expectation, ExpectationBuilder};
pub use request_criteria::RequestCriteria;
pub use response::{BodyEncoding, Headers, Response};

pub(crate) use captured::RequestsEnvelope;
pub(crate) use expectation::CreateExpectationsRequest;
