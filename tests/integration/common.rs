//! Helpers shared by the integration tests

use serde_json::json;
use shard_fetch::config::FetchConfig;
use shard_fetch::interpreter::Interpretation;
use shard_fetch::Payload;
use std::time::Duration;

/// Fetch settings tuned for tests: no idle wait, short timeouts
pub fn test_fetch_config(max_in_flight: u32, per_host_limit: u32) -> FetchConfig {
    FetchConfig {
        max_in_flight,
        per_host_limit,
        batch_size: 1,
        poll_wait_secs: 0,
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..FetchConfig::default()
    }
}

/// A client whose whole-request timeout is `timeout`
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build test client")
}

/// Interpreter that accepts every document with payload `{"n": 1}`
pub fn count_interpreter(_: &[u8]) -> anyhow::Result<Interpretation> {
    let mut payload = Payload::new();
    payload.insert("n".to_string(), json!(1));
    Ok(Interpretation::ok(payload))
}

/// Interpreter that fails on every document
pub fn failing_interpreter(_: &[u8]) -> anyhow::Result<Interpretation> {
    anyhow::bail!("document could not be interpreted")
}

/// Address on localhost with nothing listening
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("No local address").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}
