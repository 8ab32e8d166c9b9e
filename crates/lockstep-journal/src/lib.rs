//! Per-tick state hash, replay trace recording, and the committed-delta
//! change journal.
//!
//! Depends only on `lockstep-core` — this crate never touches scheduling,
//! registries, or the phase pipeline directly; the engine crate drives
//! [`HashCtx`](replay::HashCtx) and [`ReplayCtx`](replay::ReplayCtx) from
//! inside its own `tick()`.
//!
//! # Quick Start
//!
//! ```
//! use lockstep_journal::replay::HashCtx;
//! use lockstep_core::order::Phase;
//!
//! let mut ctx = HashCtx::new();
//! ctx.phase_begin(Phase::Input);
//! ctx.phase_end(Phase::Input);
//! let snap = ctx.snapshot();
//! assert_eq!(snap.phase_begin_count[Phase::Input.index()], 1);
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod journal;
pub mod replay;

pub mod prelude {
    pub use crate::error::{JournalError, JournalResult};
    pub use crate::journal::{ChangeJournal, CommittedDeltaChange};
    pub use crate::replay::{CommittedDeltaEntry, HashCtx, ReplayCtx, ReplayLog, StateHash, TickTrace};
}
