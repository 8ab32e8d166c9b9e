//! Crate-wide error type for setup-time / programmer-error conditions.
//!
//! Per-tick refusals (capacity exceeded, bad tick, unknown type) are *not*
//! represented here — they are recorded as `u32` refusal counters on the
//! owning struct and the operation simply no-ops. `CoreError` only covers
//! conditions that can't be expressed as "a bounded resource said no":
//! invalid construction arguments and allocation failure at `reserve` time.

use thiserror::Error;

/// Errors raised by `lockstep-core` setup-time operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An argument was out of range or structurally invalid (e.g. a zero id
    /// where a nonzero one is required).
    #[error("invalid argument: {reason}")]
    InvalidArg { reason: String },

    /// `reserve` was asked for a capacity that can't be represented or
    /// would overflow internal bookkeeping.
    #[error("capacity {requested} exceeds representable limit")]
    CapacityOverflow { requested: u64 },

    /// A fixed-point operation could not be represented (e.g. composing a
    /// pose would overflow `i64`).
    #[error("fixed-point overflow during {op}")]
    FixedPointOverflow { op: String },
}

/// Result alias used throughout `lockstep-core`.
pub type CoreResult<T> = Result<T, CoreError>;
