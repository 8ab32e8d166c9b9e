//! Foundational data-plane types for a deterministic tick engine: opaque
//! ids, the total ordering key, bounded work queues, integer budgets,
//! lossless owed-work accumulators, `q48_16` fixed-point arithmetic, the TLV
//! byte codec, and FNV-1a64 hashing.
//!
//! This crate knows nothing about phases, registries, or scheduling — it is
//! the vocabulary the engine crate builds on, kept separate so it can be
//! reused by the journal crate without pulling in scheduling concerns.
//!
//! # Quick Start
//!
//! ```
//! use lockstep_core::prelude::*;
//!
//! let mut budget = Budget::reserve(8, 64);
//! budget.set_limits(100, UNLIMITED, UNLIMITED);
//! budget.begin_tick(TickIndex::ZERO);
//! assert!(budget.try_consume(BudgetScope::NONE, 10));
//!
//! let key = OrderingKey::make(
//!     Phase::Commit,
//!     DomainId::new(1),
//!     ChunkId::ZERO,
//!     EntityId::new(7),
//!     ComponentId::new(3),
//!     TypeId64::new(1),
//!     Seq::ZERO,
//! );
//! assert_eq!(key.phase, Phase::Commit.as_u16());
//! ```

#![deny(unsafe_code)]

pub mod accumulator;
pub mod budget;
pub mod error;
pub mod fixed;
pub mod hash;
pub mod ids;
pub mod order;
pub mod queue;
pub mod tlv;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accumulator::{Accumulator, AccumulatorQuat, AccumulatorVec3, Component};
    pub use crate::budget::{Budget, BudgetScope, UNLIMITED};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::fixed::{compose, tick_clamp_to_i64, Pose, Q48_16, QuatQ, RoundMode, Vec3Q};
    pub use crate::hash::{fnv1a64, Fnv1a64, FNV1A64_OFFSET_BASIS};
    pub use crate::ids::{
        AgentId, ChunkId, ComponentId, DomainId, EntityId, FrameId, PropagatorId, Seq, TickIndex,
        TypeId64,
    };
    pub use crate::order::{OrderingKey, Phase, PHASE_COUNT, PHASE_ORDER};
    pub use crate::queue::{PushOutcome, WorkItem, WorkQueue};
    pub use crate::tlv::{le_read_u16, le_read_u32, le_read_u64, le_write_u16, le_write_u32, le_write_u64, tlv_write, TlvError, TlvReader, TlvRecord};
}
