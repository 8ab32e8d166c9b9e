//! The deterministic phase scheduler (§4.7-§4.13): buffers, registries,
//! and the eight-phase tick loop built on `lockstep-core`'s vocabulary.
//!
//! This crate owns the single authoritative mutation site — `commit_apply`
//! inside [`scheduler::Scheduler::tick`] — and every registry/buffer the
//! sense→mind→act/solve/commit pipeline dispatches through. The caller
//! supplies an opaque world type `W`, registers sensors/minds/actions/
//! delta handlers/propagators/domains against it, and drives ticks one at
//! a time.
//!
//! # Quick Start
//!
//! ```
//! use lockstep_engine::scheduler::{Scheduler, SchedulerCapacities};
//! use lockstep_core::ids::TickIndex;
//!
//! let mut scheduler: Scheduler<()> = Scheduler::reserve(SchedulerCapacities {
//!     phase_queue_items: 16,
//!     agents: 4,
//!     sensors: 4,
//!     minds: 4,
//!     actions: 4,
//!     delta_handlers: 4,
//!     propagators: 4,
//!     domains: 4,
//!     observation_records: 16,
//!     observation_bytes: 256,
//!     intent_records: 16,
//!     intent_bytes: 256,
//!     delta_records: 16,
//!     delta_bytes: 256,
//!     domain_cap: 4,
//!     chunk_cap: 4,
//! });
//! let mut world = ();
//! let stats = scheduler.tick(&mut world, TickIndex::ZERO);
//! assert_eq!(stats.deltas_applied, 0);
//! ```

#![deny(unsafe_code)]

pub mod act;
pub mod buffer;
pub mod commit;
pub mod delta;
pub mod domain;
pub mod due_event;
pub mod error;
pub mod frame;
pub mod mind;
pub mod propagator;
pub mod registry;
pub mod scheduler;
pub mod sense;

pub mod prelude {
    pub use crate::act::{Action, ActionRegistry, IntentBuffer, IntentHeader, dispatch_to_deltas};
    pub use crate::buffer::{PushOutcome, Record, RecordBuffer, RecordHeader};
    pub use crate::commit::{commit_apply, packet_hash, CommitStats, DeltaHandler, DeltaRegistry};
    pub use crate::delta::{DeltaBuffer, DeltaHeader, DeltaRecord};
    pub use crate::domain::{run_domain_phase, run_query, Domain, DomainRegistry, QueryDesc, QueryResult};
    pub use crate::due_event::{DueEntry, DueHandle, DueScheduler};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::frame::{eval, register_frame, FrameGraph, FrameNode, FRAME_MAX_DEPTH};
    pub use crate::mind::{EmitIntentCtx, Mind, MindRegistry, MindState};
    pub use crate::propagator::{run_solve, Propagator, PropagatorRegistry};
    pub use crate::registry::SortedRegistry;
    pub use crate::scheduler::{AgentSlot, PhaseHandlerFn, PhaseWork, Scheduler, SchedulerCapacities};
    pub use crate::sense::{ObservationBuffer, ObservationHeader, Sensor, SensorRegistry};
}
