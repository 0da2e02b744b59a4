//! Full round trip through a real proxy binary.
//!
//! Needs the everdeen binaries under `EVERDEEN_BINARIES_DIR` (or `./binaries`).
//! Run with: cargo test -p everdeen --test end_to_end -- --ignored

use everdeen::{Criterion, Expectation, ProcessManager, Response, ServerOptions, StderrSink};
use std::sync::atomic::{AtomicU16, Ordering};

static PORT_COUNTER: AtomicU16 = AtomicU16::new(24300);

fn next_ports() -> (u16, u16) {
    let base = PORT_COUNTER.fetch_add(2, Ordering::SeqCst);
    (base, base + 1)
}

#[tokio::test]
#[ignore = "requires the everdeen proxy binary"]
async fn test_captures_proxied_post() {
    let (proxy_port, control_port) = next_ports();
    let options = ServerOptions::new(proxy_port, control_port).with_stderr(StderrSink::Inherit);
    let mut server = ProcessManager::launch(options).await.unwrap();

    let registered = server
        .register_expectations(&[Expectation::builder()
            .store_matching_requests(true)
            .criterion(Criterion::method("POST"))
            .respond_with(Response::text(200, "Hello World"))
            .build()])
        .await
        .unwrap();
    let uuid = registered[0].uuid().expect("server assigns a uuid");

    let http = reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://127.0.0.1:{proxy_port}")).unwrap())
        .build()
        .unwrap();
    let reply = http
        .post("http://example.com/test")
        .body("ping")
        .send()
        .await
        .unwrap();
    assert_eq!(reply.status().as_u16(), 200);
    assert_eq!(reply.text().await.unwrap(), "Hello World");

    let requests = server.list_requests(uuid).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method(), "POST");
    assert_eq!(requests[0].body_text().unwrap(), "ping");

    server.reset_all().await.unwrap();
    assert!(server.list_expectations().await.unwrap().is_empty());

    server.stop().unwrap();
    server.wait().await.unwrap();
}
