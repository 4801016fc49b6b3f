//! Drives the CloudWatch Logs client against a local stub service.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use serial_test::serial;

use hermes_core::HermesError;
use hermes_logging::cloudwatch::Credentials;
use hermes_logging::{
    CloudWatchLogsClient, IngestError, LogEvent, LogIngestion, LoggingConfig, ServiceErrorCode,
};

#[derive(Debug, Clone)]
struct Captured {
    target: String,
    authorization: String,
    security_token: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Stub {
    captured: Arc<Mutex<Vec<Captured>>>,
    streams: Arc<Mutex<HashSet<(String, String)>>>,
}

fn error_body(error_type: &str, message: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        json!({ "__type": error_type, "message": message }).to_string(),
    )
}

async fn handle(State(stub): State<Stub>, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let target = header("x-amz-target").unwrap_or_default();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    stub.captured.lock().unwrap().push(Captured {
        target: target.clone(),
        authorization: header("authorization").unwrap_or_default(),
        security_token: header("x-amz-security-token"),
        body: body.clone(),
    });

    let group = body["logGroupName"].as_str().unwrap_or_default().to_string();
    let stream = body["logStreamName"].as_str().unwrap_or_default().to_string();

    if group == "broken-prod" {
        return (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>".to_string());
    }
    if group.ends_with("-missing") {
        return error_body(
            "com.amazonaws.logs#ResourceNotFoundException",
            "The specified log group does not exist.",
        );
    }

    match target.as_str() {
        "Logs_20140328.CreateLogStream" => {
            if stub.streams.lock().unwrap().insert((group, stream)) {
                (StatusCode::OK, "{}".to_string())
            } else {
                error_body(
                    "ResourceAlreadyExistsException",
                    "The specified log stream already exists",
                )
            }
        }
        "Logs_20140328.PutLogEvents" => (
            StatusCode::OK,
            json!({ "nextSequenceToken": "1" }).to_string(),
        ),
        _ => error_body("UnknownOperationException", "unknown operation"),
    }
}

/// Starts the stub on its own runtime thread and returns its endpoint.
fn spawn_stub() -> (String, Stub) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let stub = Stub::default();
    let state = stub.clone();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = Router::new().route("/", post(handle)).with_state(state);
            axum::serve(listener, app).await.unwrap();
        });
    });

    (format!("http://{}", addr), stub)
}

fn client_for(endpoint: &str, session_token: Option<&str>) -> CloudWatchLogsClient {
    let config = LoggingConfig {
        endpoint: Some(endpoint.to_string()),
        ..LoggingConfig::default()
    };
    let credentials = Credentials::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        session_token.map(str::to_string),
        None,
        "hermes-tests",
    );
    CloudWatchLogsClient::with_credentials(&config, credentials).unwrap()
}

#[test]
#[serial]
fn test_create_log_stream_twice_reports_already_exists() {
    let (endpoint, stub) = spawn_stub();
    let client = client_for(&endpoint, None);

    client.create_log_stream("orders-staging", "pod-7").unwrap();
    let err = client
        .create_log_stream("orders-staging", "pod-7")
        .unwrap_err();
    assert!(err.is_already_exists());

    let captured = stub.captured.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].target, "Logs_20140328.CreateLogStream");
    assert_eq!(
        captured[0].body,
        json!({ "logGroupName": "orders-staging", "logStreamName": "pod-7" })
    );
}

#[test]
#[serial]
fn test_put_log_events_sends_signed_single_event() {
    let (endpoint, stub) = spawn_stub();
    let client = client_for(&endpoint, Some("session-token"));

    let event = LogEvent {
        message: b"{\"level\":\"INFO\",\"message\":\"order placed\"}\n".to_vec(),
        timestamp: 1_700_000_000_123,
    };
    client
        .put_log_events("orders-staging", "pod-7", &[event])
        .unwrap();

    let captured = stub.captured.lock().unwrap();
    let request = &captured[0];
    assert_eq!(request.target, "Logs_20140328.PutLogEvents");
    assert_eq!(request.body["logGroupName"], "orders-staging");
    assert_eq!(request.body["logStreamName"], "pod-7");
    assert_eq!(
        request.body["logEvents"],
        json!([{
            "message": "{\"level\":\"INFO\",\"message\":\"order placed\"}\n",
            "timestamp": 1_700_000_000_123_i64
        }])
    );

    assert!(request
        .authorization
        .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(request.authorization.contains("/eu-west-1/logs/aws4_request"));
    assert!(request.authorization.contains("x-amz-security-token"));
    assert_eq!(request.security_token.as_deref(), Some("session-token"));
}

#[test]
#[serial]
fn test_missing_group_is_a_service_error() {
    let (endpoint, _stub) = spawn_stub();
    let client = client_for(&endpoint, None);

    let err = client
        .put_log_events(
            "orders-missing",
            "pod-7",
            &[LogEvent {
                message: b"lost".to_vec(),
                timestamp: 0,
            }],
        )
        .unwrap_err();
    assert_eq!(err.code(), Some(&ServiceErrorCode::ResourceNotFound));
}

#[test]
#[serial]
fn test_untyped_failure_is_unclassified() {
    let (endpoint, _stub) = spawn_stub();
    let client = client_for(&endpoint, None);

    let err = client.create_log_stream("broken-prod", "pod-7").unwrap_err();
    assert!(matches!(err, IngestError::Unclassified(ref msg) if msg.contains("CreateLogStream")));
}

#[test]
#[serial]
fn test_unreachable_endpoint_is_unclassified() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = client_for(&format!("http://127.0.0.1:{}", port), None);

    let err = client.create_log_stream("orders-staging", "pod-7").unwrap_err();
    assert!(matches!(err, IngestError::Unclassified(_)));
}

#[test]
#[serial]
fn test_calls_work_from_inside_an_async_runtime() {
    let (endpoint, stub) = spawn_stub();
    let client = client_for(&endpoint, None);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        client.create_log_stream("orders-staging", "pod-7").unwrap();
    });
    assert_eq!(stub.captured.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_session_reads_shared_credentials_file() {
    let dir = tempfile::tempdir().unwrap();
    common::isolate_aws_env(dir.path());
    std::fs::write(
        dir.path().join("credentials"),
        "[default]\naws_access_key_id = AKIDFROMFILE\naws_secret_access_key = file-secret\n",
    )
    .unwrap();

    let (endpoint, stub) = spawn_stub();
    let config = LoggingConfig {
        endpoint: Some(endpoint),
        ..LoggingConfig::default()
    };
    let client = CloudWatchLogsClient::connect(&config).unwrap();
    client.create_log_stream("orders-staging", "pod-7").unwrap();

    let captured = stub.captured.lock().unwrap();
    assert!(captured[0]
        .authorization
        .starts_with("AWS4-HMAC-SHA256 Credential=AKIDFROMFILE/"));

    common::clear_aws_env();
}

#[test]
#[serial]
fn test_session_reads_named_profile() {
    let dir = tempfile::tempdir().unwrap();
    common::isolate_aws_env(dir.path());
    std::fs::write(
        dir.path().join("config"),
        "[profile shipping]\naws_access_key_id = AKIDPROFILE\naws_secret_access_key = profile-secret\n",
    )
    .unwrap();
    std::env::set_var("AWS_PROFILE", "shipping");

    let (endpoint, stub) = spawn_stub();
    let config = LoggingConfig {
        endpoint: Some(endpoint),
        ..LoggingConfig::default()
    };
    let client = CloudWatchLogsClient::connect(&config).unwrap();
    client
        .put_log_events(
            "orders-staging",
            "pod-7",
            &[LogEvent {
                message: b"from profile\n".to_vec(),
                timestamp: 1,
            }],
        )
        .unwrap();

    let captured = stub.captured.lock().unwrap();
    assert!(captured[0].authorization.contains("Credential=AKIDPROFILE/"));

    common::clear_aws_env();
}

#[test]
#[serial]
fn test_session_without_any_credentials_fails() {
    let dir = tempfile::tempdir().unwrap();
    common::isolate_aws_env(dir.path());

    let err = CloudWatchLogsClient::connect(&LoggingConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, HermesError::Session(_)));

    common::clear_aws_env();
}
