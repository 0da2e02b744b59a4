//! Everdeen client: drive an HTTP mock/intercepting proxy from tests.
//!
//! The proxy itself is an external binary. This crate builds the expectations
//! it matches traffic against, speaks its control API, and manages the
//! process lifetime.
//!
//! # Example
//!
//! ```no_run
//! use everdeen::{Criterion, Expectation, ProcessManager, Response, ServerOptions};
//!
//! #[tokio::main]
//! async fn main() -> everdeen::Result<()> {
//!     let mut server = ProcessManager::launch(ServerOptions::new(4321, 4322)).await?;
//!
//!     let registered = server
//!         .register_expectations(&[Expectation::builder()
//!             .store_matching_requests(true)
//!             .criterion(Criterion::method("POST"))
//!             .respond_with(Response::text(200, "Hello World"))
//!             .build()])
//!         .await?;
//!
//!     // ... send traffic through http://127.0.0.1:4321 ...
//!
//!     if let Some(uuid) = registered[0].uuid() {
//!         let requests = server.list_requests(uuid).await?;
//!         println!("{} request(s) matched", requests.len());
//!     }
//!
//!     server.stop()
//! }
//! ```

pub mod client;
pub mod error;
pub mod model;
pub mod server;

pub use client::{ControlClient, PONG};
pub use error::{Error, Result};
pub use model::{
    BodyEncoding, CapturedRequest, Criterion, CriterionType, Expectation, ExpectationBuilder,
    Headers, MatchType, RequestCriteria, Response,
};
pub use server::{ProcessManager, ServerOptions, ServerState, StderrSink};
