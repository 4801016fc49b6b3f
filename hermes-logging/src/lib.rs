//! hermes-logging
//!
//! Picks a log sink for the process from the `ENV` variable: the console in
//! `dev`, CloudWatch Logs everywhere else. The chosen sink sits behind a
//! `tracing` dispatcher that is installed globally by [`init`].

use std::sync::{Arc, OnceLock};

use hermes_core::{hermes_error, hermes_println, HermesError, Result};

pub mod cloudwatch;
pub mod config;
pub mod ingest;
pub mod logger;
pub mod remote_sink;
pub mod sink;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use cloudwatch::CloudWatchLogsClient;
pub use config::{DeployMode, LogFormat, LoggingConfig, SetupFailurePolicy, WriteFailurePolicy};
pub use ingest::{IngestError, LogEvent, LogIngestion, ServiceErrorCode};
pub use logger::{Logger, SinkKind};
pub use remote_sink::RemoteSink;
pub use sink::{ConsoleSink, LogSink, MakeSinkWriter, SinkPanicLayer};

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Opens a CloudWatch Logs session for `config`.
pub fn connect_cloudwatch(config: &LoggingConfig) -> Result<Arc<dyn LogIngestion>> {
    Ok(Arc::new(CloudWatchLogsClient::connect(config)?))
}

/// Initializes process-wide logging for `service_name` from environment
/// variables and installs it as the global `tracing` dispatcher.
pub fn init(service_name: &str) -> Result<&'static Logger> {
    hermes_println!("Init logging");
    let config = LoggingConfig::from_env();
    let logger = Logger::build(service_name, &config, connect_cloudwatch)?;
    install(logger)
}

/// Like [`init`], but any failure terminates the process.
pub fn init_or_abort(service_name: &str) -> &'static Logger {
    match init(service_name) {
        Ok(logger) => logger,
        Err(e) => {
            hermes_error!("❌ Failed to initialise logging for '{}': {}", service_name, e);
            panic!("logging initialisation failed: {}", e);
        }
    }
}

/// Stores `logger` as the process logger and makes it the global `tracing`
/// dispatcher. Only the first call succeeds. If another global subscriber is
/// already installed nothing is stored and the call can be retried.
pub fn install(logger: Logger) -> Result<&'static Logger> {
    if LOGGER.get().is_some() {
        return Err(HermesError::AlreadyInitialized);
    }

    // The global default can only be set once, so this also decides races
    // between concurrent callers.
    tracing::dispatcher::set_global_default(logger.dispatch().clone()).map_err(|e| {
        HermesError::Config(format!(
            "A global tracing subscriber is already installed: {}",
            e
        ))
    })?;

    let mut stored_now = false;
    let stored = LOGGER.get_or_init(|| {
        stored_now = true;
        logger
    });
    if !stored_now {
        return Err(HermesError::AlreadyInitialized);
    }
    Ok(stored)
}

/// The process logger, if [`init`] or [`install`] has run.
pub fn logger() -> Option<&'static Logger> {
    LOGGER.get()
}
