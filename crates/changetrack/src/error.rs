use changetrack_config::ConfigLoadError;
use changetrack_core::error::{ConfigError, ErrorOrigin as CoreErrorOrigin, TrackerError};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<TrackerError> for Error {
    fn from(err: TrackerError) -> Self {
        let kind = ErrorKind::Config(err.config_error().into());

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigLoadError> for Error {
    fn from(err: ConfigLoadError) -> Self {
        Self::new(ErrorKind::Load, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Tracker setup for a record type is invalid.
    Config(ConfigErrorKind),

    /// The process-wide config file could not be read or parsed.
    Load,
}

///
/// ConfigErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ConfigErrorKind {
    /// `only` and `except` were both declared.
    ConflictingFilters,

    /// Option keys outside the known set.
    UnknownOptions,

    /// A known option with a value of the wrong shape.
    InvalidOptionValue,

    /// A declared attribute type has no registered transform.
    MissingTransform,
}

impl From<&ConfigError> for ConfigErrorKind {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::ConflictingFilters { .. } => Self::ConflictingFilters,
            ConfigError::UnknownOptions { .. } => Self::UnknownOptions,
            ConfigError::InvalidOptionValue { .. } => Self::InvalidOptionValue,
            ConfigError::MissingTransform { .. } => Self::MissingTransform,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Options,
    Transform,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Options => Self::Options,
            CoreErrorOrigin::Transform => Self::Transform,
        }
    }
}

///
/// TESTS
///
