//! `commit_apply`: the sole mutation site. Sorts the delta buffer, looks up
//! each record's handler by `type_id`, and applies it (§4.7).

use crate::delta::DeltaBuffer;
use crate::registry::SortedRegistry;
use lockstep_core::hash::FNV1A64_OFFSET_BASIS;
use lockstep_core::ids::TypeId64;
use lockstep_core::order::OrderingKey;

/// The only function in the system permitted to mutate authoritative state.
/// `W` is the world/game state the handlers operate on.
pub trait DeltaHandler<W> {
    fn apply(&self, world: &mut W, key: &OrderingKey, payload: &[u8]);

    /// Budget cost of applying this delta. Commit itself is not
    /// budget-gated (§4.7 has no `try_consume` step), so this exists for
    /// callers that want to report it, not to refuse application.
    fn estimate_cost(&self, _key: &OrderingKey, _payload: &[u8]) -> u32 {
        1
    }
}

pub type DeltaRegistry<W> = SortedRegistry<u64, Box<dyn DeltaHandler<W>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitStats {
    pub ordering_checksum: u64,
    pub deltas_applied: u32,
    pub deltas_rejected: u32,
}

/// Sorts `buffer` by `(OrderingKey, insert_index)`, then applies each record
/// in that order through its registered handler. Records whose `type_id`
/// has no registered handler are counted as rejected, not applied.
pub fn commit_apply<W>(world: &mut W, registry: &DeltaRegistry<W>, buffer: &mut DeltaBuffer) -> CommitStats {
    buffer.canonize();
    debug_assert!(buffer.is_canonical());

    let mut stats = CommitStats {
        ordering_checksum: FNV1A64_OFFSET_BASIS,
        deltas_applied: 0,
        deltas_rejected: 0,
    };

    let arena = buffer.arena();
    for record in buffer.records() {
        let key = record.header.key;
        match registry.find(key.type_id.get()) {
            None => {
                stats.deltas_rejected += 1;
                tracing::warn!(type_id = key.type_id.get(), "commit rejected: no handler registered");
            }
            Some(handler) => {
                stats.ordering_checksum = key.fold_fnv1a64(stats.ordering_checksum);
                let payload = record.payload(arena);
                handler.apply(world, &key, payload);
                stats.deltas_applied += 1;
            }
        }
    }
    stats
}

/// `packet_hash = FNV1a64(header_canonical_bytes ‖ payload_bytes)` (§6),
/// folded per committed delta into `HashCtx`/`ReplayCtx`'s `deltas_hash`.
pub fn packet_hash(type_id: TypeId64, payload: &[u8]) -> u64 {
    use lockstep_core::hash::fnv1a64_update_bytes;
    let mut h = FNV1A64_OFFSET_BASIS;
    h = fnv1a64_update_bytes(h, &type_id.get().to_le_bytes());
    h = fnv1a64_update_bytes(h, payload);
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::ids::{ChunkId, ComponentId, DomainId, EntityId, Seq, TickIndex};
    use lockstep_core::order::Phase;
    use std::cell::RefCell;

    struct RecordingHandler {
        applied: RefCell<Vec<u8>>,
        tag: u8,
    }

    impl DeltaHandler<Vec<u8>> for RecordingHandler {
        fn apply(&self, world: &mut Vec<u8>, _key: &OrderingKey, payload: &[u8]) {
            world.push(self.tag);
            self.applied.borrow_mut().extend_from_slice(payload);
        }
    }

    fn key(entity: u64, type_id: u64, seq: u32) -> OrderingKey {
        OrderingKey::make(
            Phase::Commit,
            DomainId::ZERO,
            ChunkId::ZERO,
            EntityId::new(entity),
            ComponentId::ZERO,
            lockstep_core::ids::TypeId64::new(type_id),
            Seq(seq),
        )
    }

    #[test]
    fn applies_in_canonical_order_regardless_of_push_order() {
        let mut registry: DeltaRegistry<Vec<u8>> = SortedRegistry::reserve(4);
        registry
            .add(
                100,
                Box::new(RecordingHandler {
                    applied: RefCell::new(vec![]),
                    tag: 100,
                }),
            )
            .unwrap();
        registry
            .add(
                101,
                Box::new(RecordingHandler {
                    applied: RefCell::new(vec![]),
                    tag: 101,
                }),
            )
            .unwrap();

        let mut buf = DeltaBuffer::reserve(8, 64);
        buf.begin_tick(TickIndex::ZERO);
        buf.push(key(5, 101, 0), TickIndex::ZERO, b"b");
        buf.push(key(1, 100, 0), TickIndex::ZERO, b"a");

        let mut world = Vec::new();
        let stats = commit_apply(&mut world, &registry, &mut buf);
        assert_eq!(world, vec![100, 101]);
        assert_eq!(stats.deltas_applied, 2);
        assert_eq!(stats.deltas_rejected, 0);
    }

    #[test]
    fn unregistered_type_id_is_rejected_not_applied() {
        let registry: DeltaRegistry<Vec<u8>> = SortedRegistry::reserve(4);
        let mut buf = DeltaBuffer::reserve(8, 64);
        buf.begin_tick(TickIndex::ZERO);
        buf.push(key(1, 999, 0), TickIndex::ZERO, b"x");

        let mut world = Vec::new();
        let stats = commit_apply(&mut world, &registry, &mut buf);
        assert_eq!(stats.deltas_applied, 0);
        assert_eq!(stats.deltas_rejected, 1);
        assert!(world.is_empty());
    }

    #[test]
    fn checksum_depends_on_applied_order() {
        let mut registry: DeltaRegistry<Vec<u8>> = SortedRegistry::reserve(4);
        registry
            .add(
                1,
                Box::new(RecordingHandler {
                    applied: RefCell::new(vec![]),
                    tag: 1,
                }),
            )
            .unwrap();

        let mut buf_a = DeltaBuffer::reserve(8, 64);
        buf_a.begin_tick(TickIndex::ZERO);
        buf_a.push(key(1, 1, 0), TickIndex::ZERO, b"x");
        buf_a.push(key(2, 1, 0), TickIndex::ZERO, b"y");

        let mut buf_b = DeltaBuffer::reserve(8, 64);
        buf_b.begin_tick(TickIndex::ZERO);
        buf_b.push(key(2, 1, 0), TickIndex::ZERO, b"y");
        buf_b.push(key(1, 1, 0), TickIndex::ZERO, b"x");

        let mut world = Vec::new();
        let stats_a = commit_apply(&mut world, &registry, &mut buf_a);
        let mut world2 = Vec::new();
        let stats_b = commit_apply(&mut world2, &registry, &mut buf_b);
        assert_eq!(stats_a.ordering_checksum, stats_b.ordering_checksum);
    }

    #[test]
    fn packet_hash_differs_by_payload() {
        let t = lockstep_core::ids::TypeId64::new(1);
        assert_ne!(packet_hash(t, b"a"), packet_hash(t, b"b"));
    }
}
