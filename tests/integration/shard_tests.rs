//! Whole-shard runs against mock servers

use crate::common::{client_with_timeout, count_interpreter, failing_interpreter, test_fetch_config};
use shard_fetch::interpreter::PhoneInterpreter;
use shard_fetch::provider::ListProvider;
use shard_fetch::shard::{owns, run_shard, Assignment, Shard, ShardState};
use shard_fetch::sink::MemorySink;
use shard_fetch::{FetchStatus, ShardError};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn ok_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .mount(&mock_server)
        .await;
    mock_server
}

fn page_urls(server: &MockServer, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}/page/{}", server.uri(), i))
        .collect()
}

#[tokio::test]
async fn test_single_shard_fetches_every_url() {
    let mock_server = ok_server().await;
    let urls = page_urls(&mock_server, 3);
    let sink = MemorySink::new();

    let report = run_shard(
        0,
        1,
        &test_fetch_config(4, 2),
        ListProvider::new(urls.clone()),
        count_interpreter,
        sink.clone(),
    )
    .await
    .unwrap();

    assert_eq!(report.ok, 3);
    assert_eq!(report.skipped, 0);
    assert!(sink.is_closed());

    let records = sink.records();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.status, FetchStatus::Ok);
        assert_eq!(record.payload["n"], 1);
    }
    let fetched: HashSet<_> = records.into_iter().map(|r| r.url).collect();
    assert_eq!(fetched, urls.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_two_shards_cover_every_url_once() {
    let mock_server = ok_server().await;
    let urls = page_urls(&mock_server, 10);
    let sinks = [MemorySink::new(), MemorySink::new()];

    for (id, sink) in sinks.iter().enumerate() {
        run_shard(
            id as u32,
            2,
            &test_fetch_config(3, 2),
            ListProvider::new(urls.clone()),
            count_interpreter,
            sink.clone(),
        )
        .await
        .unwrap();
    }

    let mut seen = Vec::new();
    for (id, sink) in sinks.iter().enumerate() {
        for record in sink.records() {
            assert!(owns(&record.url, id as u32, 2), "{} fetched by shard {}", record.url, id);
            seen.push(record.url);
        }
    }

    assert_eq!(seen.len(), urls.len());
    let unique: HashSet<_> = seen.into_iter().collect();
    assert_eq!(unique, urls.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_mixed_outcomes_do_not_stop_the_shard() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let urls = vec![
        format!("{}/ok", mock_server.uri()),
        format!("{}/missing", mock_server.uri()),
        format!("{}/slow", mock_server.uri()),
    ];
    let sink = MemorySink::new();
    let mut shard = Shard::with_client(
        Assignment::new(0, 1).unwrap(),
        &test_fetch_config(2, 2),
        client_with_timeout(Duration::from_millis(300)),
        ListProvider::new(urls.clone()),
        count_interpreter,
        sink.clone(),
    )
    .unwrap();

    let report = shard.run().await.unwrap();

    assert_eq!(shard.state(), ShardState::Terminated);
    assert_eq!(report.ok, 1);
    assert_eq!(report.http_errors, 1);
    assert_eq!(report.network_errors, 1);

    let status_of = |url: &str| {
        sink.records()
            .into_iter()
            .find(|r| r.url == url)
            .map(|r| r.status.to_string())
    };
    assert_eq!(status_of(&urls[0]).as_deref(), Some("OK"));
    assert_eq!(status_of(&urls[1]).as_deref(), Some("ERROR:HTTP404"));
    assert_eq!(status_of(&urls[2]).as_deref(), Some("ERROR:NETWORK"));
}

#[tokio::test]
async fn test_unknown_failure_stops_the_shard() {
    let mock_server = ok_server().await;
    let urls = page_urls(&mock_server, 5);
    let sink = MemorySink::new();
    let mut shard = Shard::new(
        Assignment::new(0, 1).unwrap(),
        &test_fetch_config(1, 1),
        ListProvider::new(urls.clone()),
        failing_interpreter,
        sink.clone(),
    )
    .unwrap();

    let result = shard.run().await;

    assert!(matches!(result, Err(ShardError::Unclassified { .. })));
    assert_eq!(shard.state(), ShardState::Running);
    assert!(!sink.is_closed());

    // A single worker stops at the first URL
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, urls[0]);
    assert_eq!(records[0].status, FetchStatus::Unknown);
}

#[tokio::test]
async fn test_phone_interpreter_end_to_end() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><script>var x = "8 (800) 000-00-00";</script></head>
            <body><p>Call +7 (495) 123-45-67 or 8 812 765-43-21</p></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    run_shard(
        0,
        1,
        &test_fetch_config(1, 1),
        ListProvider::new([format!("{}/contacts", mock_server.uri())]),
        PhoneInterpreter::new(),
        sink.clone(),
    )
    .await
    .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, FetchStatus::Ok);
    assert_eq!(records[0].payload["phones"], "84951234567,88127654321");
}

#[tokio::test]
async fn test_invalid_shard_id_is_rejected() {
    let result = run_shard(
        2,
        2,
        &test_fetch_config(1, 1),
        ListProvider::default(),
        count_interpreter,
        MemorySink::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ShardError::InvalidShard { id: 2, num_shards: 2 })
    ));
}
