//! End-to-end behavior of the typed client against mock servers.
//!
//! httpmock covers stateless cases and hit counting; the rate-limit
//! sequence (429 with a hint, then 200) uses a scripted TCP listener
//! because the retry loop runs inside the client and the mock cannot be
//! swapped between attempts.

use std::time::{Duration, Instant};

use httpmock::prelude::*;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use hny_client::resources::triggers::{NewTrigger, Threshold, ThresholdOp};
use hny_client::{
    ApiError, BlockingClient, Client, ExponentialBackoff, Filter, QueryBuilder, RetryConfig,
    TransportSecurity,
};

fn test_client(base_url: &str) -> Client {
    Client::builder()
        .api_key("hcaik_testkey")
        .base_url(base_url)
        .transport(TransportSecurity::AllowInsecureHttp)
        .retry(None)
        .build()
        .expect("client should build")
}

fn retrying_client(base_url: &str, max_retries: usize) -> Client {
    Client::builder()
        .api_key("hcaik_testkey")
        .base_url(base_url)
        .transport(TransportSecurity::AllowInsecureHttp)
        .retry(Some(RetryConfig {
            max_retries,
            backoff: ExponentialBackoff::fast(),
            ..RetryConfig::default()
        }))
        .build()
        .expect("client should build")
}

#[tokio::test]
async fn datasets_list_sends_team_key_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/1/datasets")
                .header("x-honeycomb-team", "hcaik_testkey");
            then.status(200)
                .json_body(json!([{"name": "Production", "slug": "prod"}]));
        })
        .await;

    let client = test_client(&server.base_url());
    let datasets = client.datasets().list().await.expect("list should succeed");

    mock.assert_async().await;
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].slug, "prod");
}

#[tokio::test]
async fn management_credentials_send_bearer_pair() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/1/auth")
                .header("authorization", "Bearer mgmt_key:mgmt_secret");
            then.status(200).json_body(json!({
                "id": "key-1",
                "api_key_access": {"triggers": true}
            }));
        })
        .await;

    let client = Client::builder()
        .management_key("mgmt_key", "mgmt_secret")
        .base_url(server.base_url())
        .transport(TransportSecurity::AllowInsecureHttp)
        .retry(None)
        .build()
        .expect("client should build");

    let info = client.auth().get().await.expect("auth should succeed");
    mock.assert_async().await;
    assert!(info.can("triggers"));
}

#[tokio::test]
async fn not_found_is_classified_with_request_id() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/1/datasets/ghost");
            then.status(404)
                .header("x-honeycomb-request-id", "req-abc")
                .json_body(json!({"error": "dataset not found"}));
        })
        .await;

    let client = test_client(&server.base_url());
    let err = client.datasets().get("ghost").await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.request_id(), Some("req-abc"));
    assert!(err.to_string().contains("dataset not found"));
}

#[tokio::test]
async fn validation_error_carries_field_details() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/1/triggers/prod");
            then.status(422).json_body(json!({
                "error": "invalid",
                "type_detail": [{"field": "name", "description": "required"}]
            }));
        })
        .await;

    let client = test_client(&server.base_url());
    let query = QueryBuilder::new()
        .count()
        .time_range(900)
        .build_for_trigger()
        .expect("trigger query");
    let err = client
        .triggers()
        .create(
            "prod",
            &NewTrigger::new("", query, Threshold::new(ThresholdOp::Gt, 1.0)),
        )
        .await
        .unwrap_err();

    let details = err.validation_details();
    assert!(matches!(err, ApiError::Validation { .. }));
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].field, "name");
    assert_eq!(details[0].message, "required");
}

#[tokio::test]
async fn server_errors_exhaust_retries_then_classify() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/1/boards");
            then.status(500).json_body(json!({"error": "boom"}));
        })
        .await;

    let client = retrying_client(&server.base_url(), 3);
    let err = client.boards().list().await.unwrap_err();

    assert!(matches!(err, ApiError::Server { status: 500, .. }));
    assert!(err.is_retriable());
    // 1 initial + 3 retries, never more.
    mock.assert_hits_async(4).await;
}

#[tokio::test]
async fn non_retryable_status_costs_exactly_one_attempt() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/1/recipients/nope");
            then.status(404).json_body(json!({"error": "gone"}));
        })
        .await;

    let client = retrying_client(&server.base_url(), 3);
    let err = client.recipients().get("nope").await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }));
    mock.assert_hits_async(1).await;
}

/// Serve scripted responses, one connection each, in order.
async fn serve_script(listener: TcpListener, responses: Vec<String>) {
    for response in responses {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 8192];
        let mut head = Vec::new();
        loop {
            let Ok(n) = stream.read(&mut buf).await else {
                return;
            };
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

#[tokio::test]
async fn rate_limit_hint_drives_a_single_timed_retry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let body = r#"[{"name":"Production","slug":"prod"}]"#;
    let script = vec![
        "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 2\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_owned(),
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    ];
    let server = tokio::spawn(serve_script(listener, script));

    // Enormous backoff: only the server hint can explain a ~2s wait.
    let client = Client::builder()
        .api_key("hcaik_testkey")
        .base_url(format!("http://{addr}"))
        .transport(TransportSecurity::AllowInsecureHttp)
        .max_retries(3)
        .initial_backoff(Duration::from_secs(60))
        .max_backoff(Duration::from_secs(60))
        .build()
        .expect("client should build");

    let start = Instant::now();
    let datasets = client.datasets().list().await.expect("retry should succeed");
    let elapsed = start.elapsed();

    assert_eq!(datasets[0].slug, "prod");
    assert!(elapsed >= Duration::from_secs(2), "hint wait was skipped");
    assert!(elapsed < Duration::from_secs(10), "hint was not used");

    server.abort();
}

#[tokio::test]
async fn execute_returns_null_for_no_content() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/1/markers/prod/mk1");
            then.status(204);
        })
        .await;

    let client = test_client(&server.base_url());
    let value = client
        .execute(http::Method::DELETE, "/1/markers/prod/mk1", None, None)
        .await
        .expect("delete should succeed");
    assert!(value.is_null());
}

#[tokio::test]
async fn execute_passes_extra_headers() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/1/datasets")
                .header("x-correlation-id", "corr-7");
            then.status(200).json_body(json!([]));
        })
        .await;

    let client = test_client(&server.base_url());
    let headers = vec![("x-correlation-id".to_owned(), "corr-7".to_owned())];
    client
        .execute(http::Method::GET, "/1/datasets", None, Some(&headers))
        .await
        .expect("request should succeed");
    mock.assert_async().await;
}

#[tokio::test]
async fn cancelled_operation_never_reaches_the_server() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/1/datasets");
            then.status(200).json_body(json!([]));
        })
        .await;

    let client = retrying_client(&server.base_url(), 3);
    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .execute_cancellable(http::Method::GET, "/1/datasets", None, token)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Cancelled));
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn query_run_polls_until_complete() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/1/queries/prod");
            then.status(201).json_body(json!({
                "id": "q-1",
                "time_range": 900,
                "calculations": [{"op": "COUNT"}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/1/query_results/prod");
            then.status(201)
                .json_body(json!({"id": "qr-1", "complete": false}));
        })
        .await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path("/1/query_results/prod/qr-1");
            then.status(200).json_body(json!({
                "id": "qr-1",
                "complete": true,
                "data": {"results": [{"COUNT": 42}], "series": []}
            }));
        })
        .await;

    let client = test_client(&server.base_url());
    let result = client
        .queries()
        .run(
            "prod",
            QueryBuilder::new().count().time_range(900),
            Duration::from_secs(10),
        )
        .await
        .expect("run should complete");

    poll.assert_async().await;
    assert!(result.complete);
    assert_eq!(result.data.unwrap().results[0]["COUNT"], 42);
}

#[tokio::test]
async fn invalid_query_fails_before_any_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/1/queries/prod");
            then.status(201).json_body(json!({"id": "q-1", "calculations": []}));
        })
        .await;

    let client = test_client(&server.base_url());
    let err = client
        .queries()
        .create("prod", QueryBuilder::new().count().limit(0))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidRequest { .. }));
    mock.assert_hits_async(0).await;
}

#[test]
fn blocking_client_drives_the_async_surface() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/1/datasets");
        then.status(200)
            .json_body(json!([{"name": "Production", "slug": "prod"}]));
    });

    let client = BlockingClient::build(
        Client::builder()
            .api_key("hcaik_testkey")
            .base_url(server.base_url())
            .transport(TransportSecurity::AllowInsecureHttp)
            .retry(None),
    )
    .expect("blocking client should build");

    let datasets = client
        .run(client.inner().datasets().list())
        .expect("list should succeed");
    mock.assert();
    assert_eq!(datasets[0].slug, "prod");

    let value = client
        .execute(http::Method::GET, "/1/datasets", None, None)
        .expect("execute should succeed");
    assert!(value.is_array());
}

#[tokio::test]
async fn filters_and_breakdowns_reach_the_wire() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/1/queries/prod")
                .json_body_includes(
                    json!({
                        "time_range": 3600,
                        "calculations": [{"op": "AVG", "column": "duration_ms"}],
                        "filters": [{"column": "status_code", "op": ">=", "value": 500}],
                        "breakdowns": ["service.name"]
                    })
                    .to_string(),
                );
            then.status(201).json_body(json!({
                "id": "q-2",
                "time_range": 3600,
                "calculations": [{"op": "AVG", "column": "duration_ms"}]
            }));
        })
        .await;

    let client = test_client(&server.base_url());
    let query = client
        .queries()
        .create(
            "prod",
            QueryBuilder::new()
                .avg("duration_ms")
                .filter(Filter::gte("status_code", 500))
                .breakdown("service.name")
                .time_range(3600),
        )
        .await
        .expect("create should succeed");

    mock.assert_async().await;
    assert_eq!(query.id, "q-2");
}
