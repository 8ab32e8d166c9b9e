//! Permutation-invariance of `ChangeJournal`'s query accessors: recording
//! the same multiset of committed-delta changes in a different order must
//! not change what a query by entity/component/type returns.

use lockstep_core::ids::{ChunkId, ComponentId, DomainId, EntityId, TickIndex, TypeId64};
use lockstep_journal::journal::{ChangeJournal, CommittedDeltaChange};
use proptest::prelude::*;

fn shuffled(seed: u64, mut items: Vec<usize>) -> Vec<usize> {
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    let mut rng = rand_pcg::Pcg64::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

fn change(entity: u64, component: u64, type_id: u64) -> CommittedDeltaChange {
    CommittedDeltaChange {
        tick: TickIndex::new(1),
        domain_id: DomainId::ZERO,
        chunk_id: ChunkId::ZERO,
        entity_id: EntityId::new(entity),
        component_id: ComponentId::new(component),
        type_id: TypeId64::new(type_id),
        seq: 0,
        packet_hash: 0,
    }
}

proptest! {
    #[test]
    fn query_counts_are_permutation_invariant(seed in any::<u64>()) {
        let rows = [
            (1u64, 10u64, 100u64),
            (2, 10, 200),
            (1, 20, 100),
            (3, 10, 100),
            (1, 10, 300),
        ];
        let order = shuffled(seed, (0..rows.len()).collect());

        let mut j = ChangeJournal::new();
        for &i in &order {
            let (e, c, t) = rows[i];
            j.record_change(change(e, c, t));
        }

        prop_assert_eq!(j.len(), rows.len());
        prop_assert_eq!(j.changes_for_entity(EntityId::new(1)).count(), 3);
        prop_assert_eq!(j.changes_for_component(ComponentId::new(10)).count(), 3);
        prop_assert_eq!(j.changes_for_type(TypeId64::new(100)).count(), 3);
    }
}
