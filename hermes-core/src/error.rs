use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HermesError {
    Config(String),
    Session(String),
    LogStream {
        group: String,
        stream: String,
        reason: String,
    },
    AlreadyInitialized,
}

impl Display for HermesError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            HermesError::Config(s) => write!(f, "Configuration error: {}", s),
            HermesError::Session(s) => write!(f, "Failed to establish logging session: {}", s),
            HermesError::LogStream {
                group,
                stream,
                reason,
            } => {
                write!(
                    f,
                    "Failed to create log stream '{}' in log group '{}': {}",
                    stream, group, reason
                )
            }
            HermesError::AlreadyInitialized => {
                write!(f, "Logging is already initialized for this process")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, HermesError>;
