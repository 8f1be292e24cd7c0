//! Error types for chainrack-core.

use crate::plugin::InstanceId;
use thiserror::Error;

/// Error type for chainrack-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Plugin instance {0} not found in pipeline")]
    InstanceNotFound(InstanceId),

    #[error("Instance {0} is not a section marker")]
    NotASection(InstanceId),

    #[error("Pipeline B has not been created")]
    MissingPipelineB,

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing a plugin instance.
///
/// Construction never touches the active pipeline, so the caller's state
/// is unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("Unknown plugin type: {0}")]
    UnknownType(String),

    #[error("Backing module for '{type_id}' failed to load: {reason}")]
    ModuleLoad { type_id: String, reason: String },

    #[error("Plugin construction failed: {0}")]
    Factory(String),
}
