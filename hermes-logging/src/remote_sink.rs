//! Sink that ships every formatted line to the remote log service.
//!
//! One write is one `PutLogEvents` call carrying a single event. Nothing is
//! buffered and nothing is retried.

use std::{io, sync::Arc};

use hermes_core::{hermes_error, hermes_error_hint, Clock, SystemClock};

use crate::config::WriteFailurePolicy;
use crate::ingest::{IngestError, LogEvent, LogIngestion};
use crate::sink::LogSink;

pub struct RemoteSink {
    log_group: String,
    log_stream: String,
    client: Arc<dyn LogIngestion>,
    clock: Arc<dyn Clock>,
    on_failure: WriteFailurePolicy,
}

impl RemoteSink {
    pub fn new(
        log_group: impl Into<String>,
        log_stream: impl Into<String>,
        client: Arc<dyn LogIngestion>,
    ) -> Self {
        Self {
            log_group: log_group.into(),
            log_stream: log_stream.into(),
            client,
            clock: Arc::new(SystemClock),
            on_failure: WriteFailurePolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_failure_policy(mut self, policy: WriteFailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    pub fn log_stream(&self) -> &str {
        &self.log_stream
    }

    /// Creates this sink's log stream. A stream that already exists counts as
    /// success; the log group itself must already exist.
    pub fn ensure_log_stream(&self) -> Result<(), IngestError> {
        match self
            .client
            .create_log_stream(&self.log_group, &self.log_stream)
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn fail(&self, err: IngestError) -> io::Result<usize> {
        if let IngestError::Unclassified(_) = err {
            hermes_error!(
                "Failed to deliver log event to {}/{}: {}",
                self.log_group,
                self.log_stream,
                err
            );
            return Err(io::Error::other(err));
        }

        if err.is_not_found() {
            hermes_error_hint!(
                "A CloudWatch log group does not exist with the name '{}'. Verify that it exists or that the logger is not initialised with the wrong service name",
                self.log_group
            );
        }

        match self.on_failure {
            WriteFailurePolicy::Abort => panic!(
                "log delivery to {}/{} failed: {}",
                self.log_group, self.log_stream, err
            ),
            WriteFailurePolicy::ReturnError => {
                hermes_error!(
                    "Log delivery to {}/{} failed: {}",
                    self.log_group,
                    self.log_stream,
                    err
                );
                Err(io::Error::other(err))
            }
        }
    }
}

impl LogSink for RemoteSink {
    fn write_line(&self, line: &[u8]) -> io::Result<usize> {
        let event = LogEvent {
            message: line.to_vec(),
            timestamp: self.clock.now_millis(),
        };

        match self
            .client
            .put_log_events(&self.log_group, &self.log_stream, &[event])
        {
            Ok(()) => Ok(line.len()),
            Err(err) => self.fail(err),
        }
    }
}
