//! Process-wide tracker options from TOML.
//!
//! Options live under a `[change_tracker]` table; every other table in the
//! file is ignored. Keys are not validated here: the resolver checks them
//! together with per-type overrides when a record type is first tracked.

use changetrack_core::{options::OptionLayer, tracked::TrackerRuntime};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;
use tracing::debug;

/// Name of the TOML table holding tracker options.
pub const SECTION: &str = "change_tracker";

///
/// ConfigLoadError
///

#[derive(Debug, ThisError)]
pub enum ConfigLoadError {
    #[error("failed to read tracker config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tracker config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[change_tracker] must be a table")]
    NotATable,

    #[error("[change_tracker] option '{key}' cannot be represented as JSON: {source}")]
    Convert {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    change_tracker: Option<toml::Value>,
}

/// Parse the `[change_tracker]` table out of TOML text. A missing table
/// yields an empty layer.
pub fn load_str(text: &str) -> Result<OptionLayer, ConfigLoadError> {
    let file: ConfigFile = toml::from_str(text)?;

    let table = match file.change_tracker {
        None => return Ok(OptionLayer::new()),
        Some(toml::Value::Table(table)) => table,
        Some(_) => return Err(ConfigLoadError::NotATable),
    };

    let mut layer = OptionLayer::new();
    for (key, value) in table {
        let value = serde_json::to_value(&value).map_err(|source| ConfigLoadError::Convert {
            key: key.clone(),
            source,
        })?;
        layer.insert(key, value);
    }

    Ok(layer)
}

/// Read and parse a TOML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<OptionLayer, ConfigLoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let layer = load_str(&text)?;
    debug!(
        path = %path.display(),
        keys = ?layer.keys().collect::<Vec<_>>(),
        "loaded tracker config"
    );

    Ok(layer)
}

/// Build a runtime whose process-wide layer comes from a TOML file.
pub fn load_runtime(path: impl AsRef<Path>) -> Result<TrackerRuntime, ConfigLoadError> {
    load_file(path).map(TrackerRuntime::with_config)
}

///
/// TESTS
///
