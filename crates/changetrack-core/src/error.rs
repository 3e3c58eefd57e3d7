use std::fmt;
use thiserror::Error as ThisError;

///
/// TrackerError
///
/// Structured tracker error. Only setup produces one: a broken option layer
/// or a missing transform, reported on first access of a record type. Diff,
/// snapshot, and rollback have no failure modes.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct TrackerError {
    pub origin: ErrorOrigin,
    pub message: String,

    /// Structured error detail.
    pub detail: ErrorDetail,
}

impl TrackerError {
    /// Return the configuration detail.
    #[must_use]
    pub const fn config_error(&self) -> &ConfigError {
        match &self.detail {
            ErrorDetail::Config(err) => err,
        }
    }

    #[must_use]
    pub fn display_with_origin(&self) -> String {
        format!("{}: {}", self.origin, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`TrackerError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Config(ConfigError),
}

///
/// ConfigError
///
/// Broken tracker setup: bad option layers or an attribute type with no
/// registered transform. Always reported loudly, never defaulted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error(
        "[change-tracker] options for '{model}' can have 'only' or 'except' but not both together"
    )]
    ConflictingFilters { model: String },

    #[error(
        "[change-tracker] options for '{model}' can have 'only', 'except', 'track_has_many', 'auto', 'enable_is_dirty' or 'ordered_has_many' but you are declaring: {}",
        keys.join(", ")
    )]
    UnknownOptions { model: String, keys: Vec<String> },

    #[error("[change-tracker] option '{key}' for '{model}' must be {expected}")]
    InvalidOptionValue {
        model: String,
        key: String,
        expected: &'static str,
    },

    #[error(
        "[change-tracker] could not find a '{value_type}' transform for the attribute '{field}' in model '{model}'; register one before tracking this model"
    )]
    MissingTransform {
        model: String,
        field: String,
        value_type: String,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::ConflictingFilters { .. }
            | Self::UnknownOptions { .. }
            | Self::InvalidOptionValue { .. } => ErrorOrigin::Options,
            Self::MissingTransform { .. } => ErrorOrigin::Transform,
        }
    }
}

impl From<ConfigError> for TrackerError {
    fn from(err: ConfigError) -> Self {
        Self {
            origin: err.origin(),
            message: err.to_string(),
            detail: ErrorDetail::Config(err),
        }
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Options,
    Transform,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Options => "options",
            Self::Transform => "transform",
        };
        write!(f, "{label}")
    }
}
