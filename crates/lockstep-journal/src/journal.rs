//! Change journal for committed deltas.
//!
//! Clear-per-tick accumulation with entity/component/type query
//! accessors, re-keyed for this kernel: its only
//! mutation path is a committed delta, so entries here record ordering-key
//! identity plus the delta's packet hash rather than before/after component
//! values — the kernel itself never inspects delta payload semantics.

use lockstep_core::ids::{ChunkId, ComponentId, DomainId, EntityId, TickIndex, TypeId64};
use serde::{Deserialize, Serialize};

/// One committed delta, recorded for offline inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedDeltaChange {
    pub tick: TickIndex,
    pub domain_id: DomainId,
    pub chunk_id: ChunkId,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub type_id: TypeId64,
    pub seq: u32,
    pub packet_hash: u64,
}

/// Accumulates [`CommittedDeltaChange`] entries during a tick and answers
/// entity/component/type queries over them. Cleared at the start of each
/// tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeJournal {
    changes: Vec<CommittedDeltaChange>,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_change(&mut self, change: CommittedDeltaChange) {
        self.changes.push(change);
    }

    pub fn clear(&mut self) {
        self.changes.clear();
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn all_changes(&self) -> &[CommittedDeltaChange] {
        &self.changes
    }

    pub fn changes_for_entity(&self, entity: EntityId) -> impl Iterator<Item = &CommittedDeltaChange> {
        self.changes.iter().filter(move |c| c.entity_id == entity)
    }

    pub fn changes_for_component(
        &self,
        component: ComponentId,
    ) -> impl Iterator<Item = &CommittedDeltaChange> {
        self.changes.iter().filter(move |c| c.component_id == component)
    }

    pub fn changes_for_type(&self, type_id: TypeId64) -> impl Iterator<Item = &CommittedDeltaChange> {
        self.changes.iter().filter(move |c| c.type_id == type_id)
    }
}
