//! Domain registry and spatial index (§4.11): domains act only during
//! TOPOLOGY and SOLVE, and canonicalize query results.

use crate::registry::SortedRegistry;
use lockstep_core::budget::Budget;
use lockstep_core::ids::{ChunkId, DomainId, EntityId, TickIndex};
use lockstep_core::order::Phase;

/// One canonicalized query hit. Sort key is `(result_type, domain, chunk,
/// entity, sub_id)` (§4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryResult {
    pub result_type: u32,
    pub domain_id: DomainId,
    pub chunk_id: ChunkId,
    pub entity_id: EntityId,
    pub sub_id: u64,
}

/// Opaque query description; the kernel never inspects its shape.
pub struct QueryDesc<'a> {
    pub params: &'a [u8],
}

/// `{ step_phase, query, serialize_state, hash_state }` (§4.6). `step_phase`
/// is called only for `Phase::Topology` and `Phase::Solve`; any other
/// phase is a caller error and is simply ignored by [`run_domain_phase`].
pub trait Domain {
    fn step_phase(&mut self, phase: Phase, budget: &mut Budget);

    fn query(&self, desc: &QueryDesc, results: &mut Vec<QueryResult>);

    fn serialize_state(&self) -> Vec<u8> {
        Vec::new()
    }

    fn hash_state(&self) -> u64 {
        lockstep_core::hash::FNV1A64_OFFSET_BASIS
    }
}

pub type DomainRegistry = SortedRegistry<u64, Box<dyn Domain>>;

/// Steps every registered domain, in ascending `domain_id` order, for
/// `phase`. No-op for any phase other than TOPOLOGY/SOLVE.
pub fn run_domain_phase(registry: &mut DomainRegistry, phase: Phase, budget: &mut Budget) {
    if phase != Phase::Topology && phase != Phase::Solve {
        return;
    }
    for (_domain_id, domain) in registry.iter_mut() {
        domain.step_phase(phase, budget);
    }
}

/// Runs `desc` against every registered domain and returns hits sorted by
/// `(result_type, domain, chunk, entity, sub_id)` — deterministic
/// regardless of domain registration order.
pub fn run_query(registry: &DomainRegistry, desc: &QueryDesc) -> Vec<QueryResult> {
    let mut results = Vec::new();
    for (_domain_id, domain) in registry.iter() {
        domain.query(desc, &mut results);
    }
    results.sort();
    results
}
