//! Fetch pipeline classification and concurrency caps

use crate::common::{client_with_timeout, count_interpreter, failing_interpreter, refused_url};
use shard_fetch::shard::{host_key, ConcurrencyBudget, FetchPipeline};
use shard_fetch::sink::MemorySink;
use shard_fetch::{FetchStatus, ShardError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline<I>(interpreter: I, sink: MemorySink) -> FetchPipeline<I, MemorySink>
where
    I: shard_fetch::interpreter::ContentInterpreter,
{
    FetchPipeline::new(
        client_with_timeout(Duration::from_secs(5)),
        ConcurrencyBudget::new(10, 2),
        interpreter,
        sink,
    )
}

#[tokio::test]
async fn test_http_error_status_is_recorded_without_payload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let url = format!("{}/missing", mock_server.uri());

    let status = pipeline(count_interpreter, sink.clone())
        .process(&url)
        .await
        .unwrap();

    assert_eq!(status, FetchStatus::Http(404));
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, url);
    assert_eq!(records[0].status.to_string(), "ERROR:HTTP404");
    assert!(records[0].payload().is_none());
}

#[tokio::test]
async fn test_server_error_continues() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let pipeline = pipeline(count_interpreter, sink.clone());

    for i in 0..3 {
        let url = format!("{}/page{}", mock_server.uri(), i);
        assert_eq!(pipeline.process(&url).await.unwrap(), FetchStatus::Http(503));
    }
    assert_eq!(sink.len(), 3);
}

#[tokio::test]
async fn test_success_carries_interpreter_payload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let url = format!("{}/", mock_server.uri());

    let status = pipeline(count_interpreter, sink.clone())
        .process(&url)
        .await
        .unwrap();

    assert_eq!(status, FetchStatus::Ok);
    let records = sink.records();
    assert_eq!(records[0].payload["n"], 1);
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let pipeline = FetchPipeline::new(
        client_with_timeout(Duration::from_millis(200)),
        ConcurrencyBudget::new(10, 2),
        count_interpreter,
        sink.clone(),
    );
    let url = format!("{}/slow", mock_server.uri());

    let status = pipeline.process(&url).await.unwrap();

    assert_eq!(status, FetchStatus::Network);
    assert_eq!(sink.records()[0].status.to_string(), "ERROR:NETWORK");
    assert_eq!(pipeline.budget().in_flight(), 0);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let sink = MemorySink::new();
    let url = refused_url();

    let status = pipeline(count_interpreter, sink.clone())
        .process(&url)
        .await
        .unwrap();

    assert_eq!(status, FetchStatus::Network);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_interpreter_failure_records_unknown_then_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let url = format!("{}/", mock_server.uri());

    let result = pipeline(failing_interpreter, sink.clone()).process(&url).await;

    match result {
        Err(ShardError::Unclassified { url: failed, .. }) => assert_eq!(failed, url),
        other => panic!("expected an unclassified failure, got {:?}", other),
    }
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, FetchStatus::Unknown);
    assert!(records[0].payload().is_none());
}

/// Serves `reply` verbatim to every connection, then closes it
async fn raw_server(reply: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(reply).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}/", addr)
}

fn assert_single_unknown(result: Result<FetchStatus, ShardError>, sink: &MemorySink, url: &str) {
    match result {
        Err(ShardError::Unclassified { url: failed, .. }) => assert_eq!(failed, url),
        other => panic!("expected an unclassified failure, got {:?}", other),
    }
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, url);
    assert_eq!(records[0].status.to_string(), "ERROR:UNKNOWN");
}

#[tokio::test]
async fn test_redirect_loop_is_unknown_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&mock_server)
        .await;

    let sink = MemorySink::new();
    let url = format!("{}/loop", mock_server.uri());

    let result = pipeline(count_interpreter, sink.clone()).process(&url).await;

    assert_single_unknown(result, &sink, &url);
}

#[tokio::test]
async fn test_malformed_response_is_unknown_error() {
    let url = raw_server(b"NOT AN HTTP RESPONSE AT ALL\r\n\r\n").await;
    let sink = MemorySink::new();

    let result = pipeline(count_interpreter, sink.clone()).process(&url).await;

    assert_single_unknown(result, &sink, &url);
}

#[tokio::test]
async fn test_disconnect_mid_body_is_network_error() {
    let url = raw_server(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort").await;
    let sink = MemorySink::new();

    let status = pipeline(count_interpreter, sink.clone())
        .process(&url)
        .await
        .unwrap();

    assert_eq!(status, FetchStatus::Network);
    assert_eq!(sink.records()[0].status.to_string(), "ERROR:NETWORK");
}

#[tokio::test]
async fn test_interpreter_sees_response_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello body"))
        .mount(&mock_server)
        .await;

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let captured = seen.clone();
    let interpreter = move |content: &[u8]| {
        captured.lock().unwrap().push(content.to_vec());
        count_interpreter(content)
    };

    pipeline(interpreter, MemorySink::new())
        .process(&format!("{}/", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), &[b"hello body".to_vec()]);
}

#[tokio::test]
async fn test_per_host_limit_caps_in_flight_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&mock_server)
        .await;

    let pipeline = pipeline(count_interpreter, MemorySink::new());
    let host = host_key(&mock_server.uri());
    let urls: Vec<String> = (0..6)
        .map(|i| format!("{}/page{}", mock_server.uri(), i))
        .collect();

    let done = AtomicBool::new(false);
    let peak = AtomicUsize::new(0);
    let started = Instant::now();

    let fetch_all = async {
        let results = futures::future::join_all(urls.iter().map(|url| pipeline.process(url))).await;
        done.store(true, Ordering::SeqCst);
        results
    };
    let sample = async {
        while !done.load(Ordering::SeqCst) {
            peak.fetch_max(pipeline.budget().in_flight_for(&host), Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    let (results, ()) = futures::join!(fetch_all, sample);

    assert!(results.iter().all(|r| matches!(r, Ok(FetchStatus::Ok))));
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    // Six requests two at a time take at least three delay periods
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_global_limit_caps_in_flight_requests() {
    let servers = [
        MockServer::start().await,
        MockServer::start().await,
        MockServer::start().await,
    ];
    for server in &servers {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
            .mount(server)
            .await;
    }

    let pipeline = FetchPipeline::new(
        client_with_timeout(Duration::from_secs(5)),
        ConcurrencyBudget::new(3, 2),
        count_interpreter,
        MemorySink::new(),
    );
    let urls: Vec<String> = servers
        .iter()
        .flat_map(|server| (0..3).map(move |i| format!("{}/page{}", server.uri(), i)))
        .collect();

    let done = AtomicBool::new(false);
    let peak = AtomicUsize::new(0);

    let fetch_all = async {
        let results = futures::future::join_all(urls.iter().map(|url| pipeline.process(url))).await;
        done.store(true, Ordering::SeqCst);
        results
    };
    let sample = async {
        while !done.load(Ordering::SeqCst) {
            peak.fetch_max(pipeline.budget().in_flight(), Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    let (results, ()) = futures::join!(fetch_all, sample);

    assert_eq!(results.len(), 9);
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}
