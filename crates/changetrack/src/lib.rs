//! ## Crate layout
//! - `core`: the tracker engine (schema models, transforms, option
//!   resolution, checkpoints, change detection, dirtiness, rollback, the
//!   serializer filter, and the in-memory reference host).
//! - `config`: loading the process-wide option layer from TOML.
//! - `error`: the public error type.
//!
//! The `prelude` module holds what a record integration needs day to day.

pub use changetrack_config as config;
pub use changetrack_core as core;

pub mod error;

pub use error::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        core::{
            detect::{Change, ChangeSet},
            filter::{KeepOnlyChanged, SerializeHook},
            prelude::*,
            transform::Transform,
        },
    };
}

/// Build a runtime from a TOML config file.
pub fn runtime_from_file(
    path: impl AsRef<std::path::Path>,
) -> Result<core::tracked::TrackerRuntime, Error> {
    config::load_runtime(path).map_err(Error::from)
}
