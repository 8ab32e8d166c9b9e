//! The total order: [`Phase`] and [`OrderingKey`].
//!
//! `OrderingKey` is the sole sort key for phase queues, the delta buffer, and
//! intent canonicalization. Two keys compare equal only when every field is
//! equal; producers are responsible for assigning a `seq` that makes ties
//! between distinct sources of work impossible within a tick.

use crate::ids::{ChunkId, ComponentId, DomainId, EntityId, Seq, TypeId64};
use serde::{Deserialize, Serialize};

/// The eight fixed per-tick phases, in their immutable execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Phase {
    Input = 0,
    Topology = 1,
    Sense = 2,
    Mind = 3,
    Action = 4,
    Solve = 5,
    Commit = 6,
    Hash = 7,
}

/// Total number of phases; also the bound used for `phase_begin_count`
/// / `phase_end_count` arrays.
pub const PHASE_COUNT: usize = 8;

/// The fixed phase execution order for one tick.
pub const PHASE_ORDER: [Phase; PHASE_COUNT] = [
    Phase::Input,
    Phase::Topology,
    Phase::Sense,
    Phase::Mind,
    Phase::Action,
    Phase::Solve,
    Phase::Commit,
    Phase::Hash,
];

impl Phase {
    /// Debug/telemetry name only — never used for determinism.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Input => "INPUT",
            Phase::Topology => "TOPOLOGY",
            Phase::Sense => "SENSE",
            Phase::Mind => "MIND",
            Phase::Action => "ACTION",
            Phase::Solve => "SOLVE",
            Phase::Commit => "COMMIT",
            Phase::Hash => "HASH",
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as u16 as usize
    }

    /// The phase following this one, if any (`Hash` has no successor).
    pub const fn next(self) -> Option<Phase> {
        match self {
            Phase::Input => Some(Phase::Topology),
            Phase::Topology => Some(Phase::Sense),
            Phase::Sense => Some(Phase::Mind),
            Phase::Mind => Some(Phase::Action),
            Phase::Action => Some(Phase::Solve),
            Phase::Solve => Some(Phase::Commit),
            Phase::Commit => Some(Phase::Hash),
            Phase::Hash => None,
        }
    }
}

/// The canonical identity for any unit of ordered work or state delta:
/// `(phase, domain_id, chunk_id, entity_id, component_id, type_id, seq)`,
/// compared lexicographically in that field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    pub phase: u16,
    pub domain_id: DomainId,
    pub chunk_id: ChunkId,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub type_id: TypeId64,
    pub seq: Seq,
}

impl OrderingKey {
    #[allow(clippy::too_many_arguments)]
    pub fn make(
        phase: Phase,
        domain_id: DomainId,
        chunk_id: ChunkId,
        entity_id: EntityId,
        component_id: ComponentId,
        type_id: TypeId64,
        seq: Seq,
    ) -> Self {
        OrderingKey {
            phase: phase.as_u16(),
            domain_id,
            chunk_id,
            entity_id,
            component_id,
            type_id,
            seq,
        }
    }

    /// Fold this key's fields, little-endian encoded, into a running FNV-1a64
    /// hash. Used by delta commit's `ordering_checksum` (§4.7).
    pub fn fold_fnv1a64(&self, mut h: u64) -> u64 {
        use crate::hash::fnv1a64_update_bytes;
        h = fnv1a64_update_bytes(h, &self.phase.to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.domain_id.get().to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.chunk_id.get().to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.entity_id.get().to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.component_id.get().to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.type_id.get().to_le_bytes());
        h = fnv1a64_update_bytes(h, &self.seq.get().to_le_bytes());
        h
    }
}
