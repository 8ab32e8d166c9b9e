use lockstep_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("registry already has an entry for this id")]
    DuplicateRegistration,

    #[error("registry is full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    #[error("frame graph has no path from this frame to WORLD within the depth bound")]
    InvalidFrame,

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
