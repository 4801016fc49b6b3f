//! In-memory ingestion client for tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::ingest::{IngestError, LogEvent, LogIngestion, ServiceErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    CreateLogStream {
        group: String,
        stream: String,
    },
    PutLogEvents {
        group: String,
        stream: String,
        events: Vec<LogEvent>,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    streams: HashSet<(String, String)>,
    known_groups: Option<HashSet<String>>,
    create_failure: Option<IngestError>,
    put_failure: Option<IngestError>,
    next_put_failure: Option<IngestError>,
}

/// Records every call and behaves like the real service for stream creation:
/// the first create succeeds, repeats fail with `ResourceAlreadyExists`.
#[derive(Default)]
pub struct RecordingIngestion {
    state: Mutex<State>,
}

impl RecordingIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the service to the given log groups; anything else answers
    /// `ResourceNotFound`.
    pub fn with_groups(groups: &[&str]) -> Self {
        let ingestion = Self::default();
        ingestion.state().known_groups = Some(groups.iter().map(|g| g.to_string()).collect());
        ingestion
    }

    pub fn fail_create_with(&self, err: IngestError) {
        self.state().create_failure = Some(err);
    }

    pub fn fail_put_with(&self, err: IngestError) {
        self.state().put_failure = Some(err);
    }

    /// Fails only the next put; later puts behave normally.
    pub fn fail_next_put_with(&self, err: IngestError) {
        self.state().next_put_failure = Some(err);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn put_calls(&self) -> Vec<(String, String, Vec<LogEvent>)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::PutLogEvents {
                    group,
                    stream,
                    events,
                } => Some((group.clone(), stream.clone(), events.clone())),
                RecordedCall::CreateLogStream { .. } => None,
            })
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn group_missing(state: &State, group: &str) -> Option<IngestError> {
    let known = state.known_groups.as_ref()?;
    if known.contains(group) {
        None
    } else {
        Some(IngestError::service(
            ServiceErrorCode::ResourceNotFound,
            "The specified log group does not exist.",
        ))
    }
}

impl LogIngestion for RecordingIngestion {
    fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), IngestError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::CreateLogStream {
            group: group.to_string(),
            stream: stream.to_string(),
        });

        if let Some(err) = state.create_failure.clone() {
            return Err(err);
        }
        if let Some(err) = group_missing(&state, group) {
            return Err(err);
        }
        if !state.streams.insert((group.to_string(), stream.to_string())) {
            return Err(IngestError::service(
                ServiceErrorCode::ResourceAlreadyExists,
                "The specified log stream already exists",
            ));
        }
        Ok(())
    }

    fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), IngestError> {
        let mut state = self.state();
        state.calls.push(RecordedCall::PutLogEvents {
            group: group.to_string(),
            stream: stream.to_string(),
            events: events.to_vec(),
        });

        if let Some(err) = state.next_put_failure.take() {
            return Err(err);
        }
        if let Some(err) = state.put_failure.clone() {
            return Err(err);
        }
        if let Some(err) = group_missing(&state, group) {
            return Err(err);
        }
        Ok(())
    }
}
