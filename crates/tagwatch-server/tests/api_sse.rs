mod common;

use common::{test_state, tweet, wait_for};
use std::time::Duration;
use tagwatch_server::app;
use tokio::net::TcpListener;

/// Reads SSE chunks until one event carries `needle`.
async fn read_until(response: &mut reqwest::Response, needle: &str) -> String {
    let mut seen = String::new();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let chunk = response
                .chunk()
                .await
                .expect("failed to read chunk")
                .expect("stream closed");
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains(needle) {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no event containing {needle:?}; received: {seen}"));
    seen
}

#[tokio::test]
async fn sse_stream_sends_snapshot_then_changes() {
    let (state, upstream) = test_state();
    let app = app(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let mut response = client
        .get(format!("{}/events/stream", server_url))
        .send()
        .await
        .expect("failed to connect to SSE stream");
    assert!(response.status().is_success());

    // The current snapshot arrives before any mutation.
    let initial = read_until(&mut response, "\"hashtag\"").await;
    assert!(initial.contains("event: change"));
    assert!(initial.contains("\"watching\":false"));

    let watched = client
        .post(format!("{}/api/watch/demo", server_url))
        .send()
        .await
        .unwrap();
    assert!(watched.status().is_success());
    read_until(&mut response, "\"watching\":true").await;

    upstream.feed().send(Ok(tweet("demo over sse"))).unwrap();
    wait_for(&state, |s| s.pending.len() == 1).await;
    let event = read_until(&mut response, "demo over sse").await;
    assert!(event.contains("\"screen_name\":\"seven\""));
}
