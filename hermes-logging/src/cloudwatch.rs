//! CloudWatch Logs client built on the AWS SDK.
//!
//! The session comes from the standard AWS provider chain (environment,
//! shared config and credentials files, web identity, container and
//! instance metadata). The SDK is async, so every call runs on a private
//! runtime while the caller blocks on the reply. This keeps the sink
//! synchronous and lets it be used from inside another runtime.

use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_cloudwatchlogs::config::Region;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use aws_sdk_cloudwatchlogs::Client;
use tokio::runtime::{Builder, Runtime};

use hermes_core::{HermesError, Result};

use crate::config::LoggingConfig;
use crate::ingest::{IngestError, LogEvent, LogIngestion, ServiceErrorCode};

pub use aws_credential_types::Credentials;

/// Everything needed to open a session, owned so it can move onto the
/// ingestion runtime.
struct SessionSettings {
    region: String,
    endpoint: Option<String>,
    request_timeout: Option<Duration>,
    credentials: Option<Credentials>,
}

impl SessionSettings {
    fn new(config: &LoggingConfig, credentials: Option<Credentials>) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            request_timeout: config.request_timeout,
            credentials,
        }
    }

    async fn load(self) -> Result<SdkConfig> {
        // One attempt per call: a failed write is reported, never replayed.
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region))
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = self.request_timeout {
            loader = loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }
        if let Some(credentials) = self.credentials {
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;
        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            HermesError::Session("No AWS credentials provider is configured".to_string())
        })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| HermesError::Session(DisplayErrorContext(&e).to_string()))?;

        Ok(sdk_config)
    }
}

/// Blocking facade over the CloudWatch Logs SDK client.
pub struct CloudWatchLogsClient {
    client: Client,
    runtime: Option<Runtime>,
}

impl CloudWatchLogsClient {
    /// Establishes a session for the configured region. Credentials are
    /// resolved eagerly so a session without them fails here rather than on
    /// the first write.
    pub fn connect(config: &LoggingConfig) -> Result<Self> {
        Self::open(SessionSettings::new(config, None))
    }

    /// Establishes a session with fixed credentials instead of the provider
    /// chain.
    pub fn with_credentials(config: &LoggingConfig, credentials: Credentials) -> Result<Self> {
        Self::open(SessionSettings::new(config, Some(credentials)))
    }

    fn open(settings: SessionSettings) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("hermes-cloudwatch")
            .enable_all()
            .build()
            .map_err(|e| {
                HermesError::Session(format!("Failed to start the ingestion runtime: {}", e))
            })?;

        let sdk_config = run_on(&runtime, settings.load()).ok_or_else(|| {
            HermesError::Session("Session setup was cancelled".to_string())
        })??;

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime: Some(runtime),
        })
    }

    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|region| region.as_ref())
    }

    fn run<F>(&self, operation: &str, call: F) -> std::result::Result<(), IngestError>
    where
        F: Future<Output = std::result::Result<(), IngestError>> + Send + 'static,
    {
        self.runtime
            .as_ref()
            .and_then(|runtime| run_on(runtime, call))
            .unwrap_or_else(|| {
                Err(IngestError::Unclassified(format!(
                    "{} was cancelled before a response arrived",
                    operation
                )))
            })
    }
}

impl Drop for CloudWatchLogsClient {
    fn drop(&mut self) {
        // A blocking shutdown panics when dropped from async code.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Runs `future` on `runtime` and blocks the calling thread until it
/// finishes. `None` means the task never reported back.
fn run_on<F>(runtime: &Runtime, future: F) -> Option<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    runtime.spawn(async move {
        let _ = tx.send(future.await);
    });
    rx.recv().ok()
}

/// Only errors the service identified by code count as service errors.
/// Everything else (dispatch, timeout, unreadable response) is unclassified.
fn classify<E>(operation: &str, err: SdkError<E>) -> IngestError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service) = &err {
        let service_err = service.err();
        if let Some(code) = service_err.code() {
            return IngestError::service(
                ServiceErrorCode::from_type(code),
                service_err.message().unwrap_or_default(),
            );
        }
    }
    IngestError::Unclassified(format!(
        "{} request failed: {}",
        operation,
        DisplayErrorContext(&err)
    ))
}

impl LogIngestion for CloudWatchLogsClient {
    fn create_log_stream(&self, group: &str, stream: &str) -> std::result::Result<(), IngestError> {
        let request = self
            .client
            .create_log_stream()
            .log_group_name(group)
            .log_stream_name(stream);

        self.run("CreateLogStream", async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|e| classify("CreateLogStream", e))
        })
    }

    fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> std::result::Result<(), IngestError> {
        // The API takes text; invalid UTF-8 is only replaced here.
        let log_events = events
            .iter()
            .map(|event| {
                InputLogEvent::builder()
                    .message(String::from_utf8_lossy(&event.message).into_owned())
                    .timestamp(event.timestamp)
                    .build()
                    .map_err(|e| {
                        IngestError::Unclassified(format!("Invalid log event: {}", e))
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let request = self
            .client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_log_events(Some(log_events));

        self.run("PutLogEvents", async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|e| classify("PutLogEvents", e))
        })
    }
}
