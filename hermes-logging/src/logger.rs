use std::sync::Arc;

use hermes_core::{hermes_warning, HermesError, Result};
use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, registry, EnvFilter};

use crate::config::{LogFormat, LoggingConfig, SetupFailurePolicy};
use crate::ingest::LogIngestion;
use crate::remote_sink::RemoteSink;
use crate::sink::{ConsoleSink, LogSink, MakeSinkWriter, SinkPanicLayer};

/// Target prefixes of the ingestion stack. Their events would be shipped by
/// the very client that emitted them, so they are always off.
const QUIET_TARGETS: &[&str] = &[
    "aws_config",
    "aws_credential_types",
    "aws_runtime",
    "aws_sdk_cloudwatchlogs",
    "aws_sigv4",
    "aws_smithy",
    "h2",
    "hyper",
    "rustls",
    "tower",
];

/// Which sink a [`Logger`] writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    Remote { log_group: String, log_stream: String },
}

/// A ready-to-use tracing dispatcher bound to one sink.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    kind: SinkKind,
}

impl Logger {
    /// Selects and builds the sink for `service_name`.
    ///
    /// In dev mode the console sink is used and `connect` is never called.
    /// Otherwise `connect` establishes the ingestion session and the log
    /// stream named after the host is created in `<service>-<mode>`.
    pub fn build<F>(service_name: &str, config: &LoggingConfig, connect: F) -> Result<Self>
    where
        F: FnOnce(&LoggingConfig) -> Result<Arc<dyn LogIngestion>>,
    {
        if config.mode.is_dev() {
            return Self::console(config);
        }

        match Self::connect_remote(service_name, config, connect) {
            Ok(sink) => Self::remote(sink, config),
            Err(e) => match config.on_setup_failure {
                SetupFailurePolicy::Fatal => Err(e),
                SetupFailurePolicy::DegradeToConsole => {
                    hermes_warning!("Remote logging unavailable, using console: {}", e);
                    Self::console(config)
                }
            },
        }
    }

    fn connect_remote<F>(service_name: &str, config: &LoggingConfig, connect: F) -> Result<RemoteSink>
    where
        F: FnOnce(&LoggingConfig) -> Result<Arc<dyn LogIngestion>>,
    {
        let client = connect(config)?;
        let sink = RemoteSink::new(
            config.log_group_name(service_name),
            config.host.clone(),
            client,
        )
        .with_failure_policy(config.on_write_failure);

        sink.ensure_log_stream()
            .map_err(|e| HermesError::LogStream {
                group: sink.log_group().to_string(),
                stream: sink.log_stream().to_string(),
                reason: e.to_string(),
            })?;

        Ok(sink)
    }

    pub fn console(config: &LoggingConfig) -> Result<Self> {
        Self::from_sink(Arc::new(ConsoleSink), SinkKind::Console, config)
    }

    pub fn remote(sink: RemoteSink, config: &LoggingConfig) -> Result<Self> {
        let kind = SinkKind::Remote {
            log_group: sink.log_group().to_string(),
            log_stream: sink.log_stream().to_string(),
        };
        Self::from_sink(Arc::new(sink), kind, config)
    }

    pub fn from_sink(sink: Arc<dyn LogSink>, kind: SinkKind, config: &LoggingConfig) -> Result<Self> {
        let dispatch = build_dispatch(MakeSinkWriter::new(sink), config)?;
        Ok(Self { dispatch, kind })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn kind(&self) -> &SinkKind {
        &self.kind
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, SinkKind::Remote { .. })
    }

    /// Runs `f` with this logger as the thread's default dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// Builds the filter from the user's directives plus the quiet targets.
/// User directives naming a quiet target are dropped with a warning, so the
/// `off` directives always win.
fn build_filter(level: &str) -> Result<EnvFilter> {
    let (kept, ignored): (Vec<&str>, Vec<&str>) = level
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .partition(|directive| !names_quiet_target(directive));
    if !ignored.is_empty() {
        hermes_warning!(
            "Ignoring log directives for the ingestion stack: {}",
            ignored.join(",")
        );
    }

    let directives: Vec<String> = kept
        .into_iter()
        .map(str::to_string)
        .chain(QUIET_TARGETS.iter().map(|target| format!("{}=off", target)))
        .collect();

    EnvFilter::try_new(directives.join(","))
        .map_err(|e| HermesError::Config(format!("Invalid log level '{}': {}", level, e)))
}

fn names_quiet_target(directive: &str) -> bool {
    let target = directive
        .split(|c: char| c == '=' || c == '[')
        .next()
        .unwrap_or(directive)
        .trim();
    QUIET_TARGETS.iter().any(|quiet| target.starts_with(quiet))
}

fn build_dispatch(writer: MakeSinkWriter, config: &LoggingConfig) -> Result<Dispatch> {
    let env_filter = build_filter(&config.level)?;
    let fmt_layer = fmt::layer().with_ansi(false).with_writer(writer);
    let subscriber = registry().with(env_filter);

    let dispatch = match config.format {
        LogFormat::Json => Dispatch::new(subscriber.with(fmt_layer.json()).with(SinkPanicLayer)),
        LogFormat::Human => Dispatch::new(subscriber.with(fmt_layer).with(SinkPanicLayer)),
    };
    Ok(dispatch)
}
