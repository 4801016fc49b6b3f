// Standard library
use std::env;
use std::time::Duration;

/// Default region for the remote log service.
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Value of `ENV` that selects console logging.
pub const DEV_MODE: &str = "dev";

/// Deployment mode read from `ENV`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployMode {
    Dev,
    /// Any other value, including an empty one. Used verbatim in the log
    /// group name.
    Deployed(String),
}

impl DeployMode {
    pub fn parse(value: &str) -> Self {
        if value == DEV_MODE {
            DeployMode::Dev
        } else {
            DeployMode::Deployed(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeployMode::Dev => DEV_MODE,
            DeployMode::Deployed(mode) => mode,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, DeployMode::Dev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Human,
}

/// What to do when the remote sink cannot be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupFailurePolicy {
    /// Surface the error; `init_or_abort` turns it into a process abort.
    #[default]
    Fatal,
    DegradeToConsole,
}

/// What a remote write does when the service rejects it with a known error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    #[default]
    Abort,
    ReturnError,
}

/// Configuration for the logging bootstrap
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub mode: DeployMode,
    /// Host identity, used unaltered as the log stream name.
    pub host: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub request_timeout: Option<Duration>,
    /// `EnvFilter` directive string.
    pub level: String,
    pub format: LogFormat,
    pub on_setup_failure: SetupFailurePolicy,
    pub on_write_failure: WriteFailurePolicy,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            mode: DeployMode::Deployed(String::new()),
            host: String::new(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            request_timeout: None,
            level: "info".to_string(),
            format: LogFormat::Json,
            on_setup_failure: SetupFailurePolicy::default(),
            on_write_failure: WriteFailurePolicy::default(),
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            mode: DeployMode::parse(&lookup("ENV").unwrap_or_default()),
            host: lookup("HOSTNAME").unwrap_or_default(),
            region: lookup("AWS_REGION")
                .filter(|r| !r.is_empty())
                .unwrap_or(defaults.region),
            endpoint: lookup("HERMES_LOGS_ENDPOINT").filter(|e| !e.is_empty()),
            request_timeout: parse_timeout(lookup("HERMES_LOGS_TIMEOUT_SECS")),
            level: lookup("LOG_LEVEL")
                .filter(|l| !l.is_empty())
                .unwrap_or(defaults.level),
            format: parse_log_format(lookup("LOG_FORMAT")),
            on_setup_failure: parse_setup_policy(lookup("HERMES_ON_SETUP_FAILURE")),
            on_write_failure: parse_write_policy(lookup("HERMES_ON_WRITE_FAILURE")),
        }
    }

    /// Log group name for a service: `<service>-<mode>`.
    pub fn log_group_name(&self, service_name: &str) -> String {
        format!("{}-{}", service_name, self.mode.as_str())
    }
}

fn parse_timeout(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_log_format(value: Option<String>) -> LogFormat {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        Some("human") | Some("pretty") => LogFormat::Human,
        _ => LogFormat::Json,
    }
}

fn parse_setup_policy(value: Option<String>) -> SetupFailurePolicy {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        Some("console") | Some("degrade") => SetupFailurePolicy::DegradeToConsole,
        _ => SetupFailurePolicy::Fatal,
    }
}

fn parse_write_policy(value: Option<String>) -> WriteFailurePolicy {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        Some("return") | Some("error") => WriteFailurePolicy::ReturnError,
        _ => WriteFailurePolicy::Abort,
    }
}
