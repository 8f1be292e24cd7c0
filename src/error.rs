//! Centralized error type for the chainrack umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] chainrack_core::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plugin '{0}' was not inserted")]
    NotInserted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<chainrack_core::ConstructionError> for Error {
    fn from(error: chainrack_core::ConstructionError) -> Self {
        Self::Core(error.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
