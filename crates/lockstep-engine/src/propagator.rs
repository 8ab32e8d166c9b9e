//! Propagator registry (SOLVE phase, §4.10): semantics-free vtable plus
//! sorted `(domain_id, prop_id)` iteration.

use crate::registry::SortedRegistry;
use lockstep_core::budget::Budget;
use lockstep_core::ids::{DomainId, PropagatorId, TickIndex};

/// `{ step, sample, serialize_state, hash_state }` (§4.6). The kernel
/// knows nothing about what a propagator computes; it only knows the
/// well-behaved sequence `step` is expected to follow (§4.10): add owed
/// work to the accumulator, read remaining budget, pay what it can,
/// report what was actually consumed.
pub trait Propagator {
    fn step(&mut self, tick: TickIndex, budget: &mut Budget);

    /// Read-only snapshot for diagnostics/replay; not part of the
    /// determinism witness on its own (hash_state is).
    fn sample(&self) -> Vec<u8> {
        Vec::new()
    }

    fn serialize_state(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Folded into the tick's state hash alongside the accumulator's
    /// owed/paid bookkeeping (§4.10).
    fn hash_state(&self) -> u64 {
        lockstep_core::hash::FNV1A64_OFFSET_BASIS
    }
}

pub type PropagatorRegistry = SortedRegistry<(u64, u64), Box<dyn Propagator>>;

/// Steps every registered propagator in ascending `(domain_id, prop_id)`
/// order, folding each one's `hash_state()` into a running FNV-1a64 value.
pub fn run_solve(registry: &mut PropagatorRegistry, tick: TickIndex, budget: &mut Budget) -> u64 {
    use lockstep_core::hash::fnv1a64_update_bytes;
    let mut hash = lockstep_core::hash::FNV1A64_OFFSET_BASIS;
    for (_key, propagator) in registry.iter_mut() {
        propagator.step(tick, budget);
        hash = fnv1a64_update_bytes(hash, &propagator.hash_state().to_le_bytes());
    }
    hash
}

pub fn key(domain_id: DomainId, prop_id: PropagatorId) -> (u64, u64) {
    (domain_id.get(), prop_id.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingPropagator {
        steps: u32,
    }

    impl Propagator for CountingPropagator {
        fn step(&mut self, _tick: TickIndex, _budget: &mut Budget) {
            self.steps += 1;
        }

        fn hash_state(&self) -> u64 {
            self.steps as u64
        }
    }

    #[test]
    fn steps_run_in_domain_then_propagator_order() {
        let mut registry: PropagatorRegistry = SortedRegistry::reserve(4);
        registry
            .add(key(DomainId::new(2), PropagatorId::new(1)), Box::new(CountingPropagator { steps: 0 }))
            .unwrap();
        registry
            .add(key(DomainId::new(1), PropagatorId::new(5)), Box::new(CountingPropagator { steps: 0 }))
            .unwrap();
        let order: Vec<(u64, u64)> = registry.iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec![(1, 5), (2, 1)]);

        let mut budget = Budget::reserve(2, 2);
        let hash_a = run_solve(&mut registry, TickIndex::ZERO, &mut budget);
        let hash_b = run_solve(&mut registry, TickIndex::ZERO, &mut budget);
        assert_ne!(hash_a, hash_b);
    }
}
