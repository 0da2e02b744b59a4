//! In-process stand-in for the proxy's control API.
//!
//! Implements just enough of the control endpoints to exercise the client and
//! the readiness poll: expectations are stored as raw JSON, captured requests
//! are seeded by the test.

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request the fake server received.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

#[derive(Debug)]
pub struct FakeState {
    pub expectations: Vec<Value>,
    pub captured: HashMap<String, Vec<Value>>,
    pub received: Vec<Received>,
    pub ping_reply: String,
    /// Answer JSON endpoints with a body that is not JSON.
    pub malformed: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            expectations: Vec::new(),
            captured: HashMap::new(),
            received: Vec::new(),
            ping_reply: "PONG".to_string(),
            malformed: false,
        }
    }
}

pub struct FakeControlServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<FakeState>>,
    handle: JoinHandle<()>,
}

impl FakeControlServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(FakeState::default()));

        let shared = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&shared);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { route(req, state).await }
                    });
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Store a captured request under `uuid`.
    pub fn capture(&self, uuid: &str, request: Value) {
        self.state
            .lock()
            .unwrap()
            .captured
            .entry(uuid.to_string())
            .or_default()
            .push(request);
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.lock().unwrap().received.clone()
    }
}

impl Drop for FakeControlServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn route(
    req: Request<Incoming>,
    state: Arc<Mutex<FakeState>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let bytes = req.into_body().collect().await?.to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.received.push(Received {
        method: method.clone(),
        path: path.clone(),
        body: body.clone(),
    });

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["ping"]) => text(StatusCode::OK, state.ping_reply.clone()),
        (&Method::GET, ["expectations"]) => json_reply(&state, Value::Array(state.expectations.clone())),
        (&Method::POST, ["expectations"]) => {
            let mut created = Vec::new();
            for mut expectation in body["expectations"].as_array().cloned().unwrap_or_default() {
                expectation["uuid"] = json!(uuid::Uuid::new_v4().to_string());
                expectation["matches"] = json!(0);
                created.push(expectation);
            }
            state.expectations.extend(created.iter().cloned());
            json_reply(&state, Value::Array(created))
        }
        (&Method::GET, ["expectations", uuid, "requests"]) => {
            let requests = state.captured.get(*uuid).cloned().unwrap_or_default();
            json_reply(&state, json!({ "requests": requests }))
        }
        (&Method::POST, ["requests"]) => {
            let requests: Vec<Value> = state.captured.values().flatten().cloned().collect();
            json_reply(&state, json!({ "requests": requests }))
        }
        (&Method::DELETE, ["reset", "all"]) => {
            state.expectations.clear();
            state.captured.clear();
            text(StatusCode::OK, String::new())
        }
        _ => text(StatusCode::NOT_FOUND, "everdeen: Not Found".to_string()),
    };

    Ok(response)
}

fn text(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn json_reply(state: &FakeState, value: Value) -> Response<Full<Bytes>> {
    let body = if state.malformed {
        "<html>oops</html>".to_string()
    } else {
        value.to_string()
    };
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
