//! Error types for chainrack-dsp

use thiserror::Error;

/// Errors raised by module-backed plugins and their linear memory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleError {
    #[error("Module failed to load: {0}")]
    Load(String),

    #[error("Module instantiation failed: {0}")]
    Instantiate(String),

    #[error("Memory access out of bounds: offset {offset} + {len} exceeds {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("Memory view from epoch {view} is stale (memory is at epoch {memory})")]
    StaleView { view: u64, memory: u64 },

    #[error("Memory growth to {requested} samples exceeds limit of {limit}")]
    MemoryLimit { requested: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, ModuleError>;
