//! The delta buffer: every authoritative mutation for a tick, staged until
//! COMMIT sorts and applies it (§4.5, §4.7).

use crate::buffer::{PushOutcome, Record, RecordBuffer, RecordHeader};
use lockstep_core::ids::TickIndex;
use lockstep_core::order::OrderingKey;

/// A delta record's header: the tick it's valid for, the commit ordering
/// key phase handlers built it with, and its declared payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaHeader {
    pub tick: TickIndex,
    pub key: OrderingKey,
    pub payload_len: u32,
}

impl RecordHeader for DeltaHeader {
    fn tick(&self) -> TickIndex {
        self.tick
    }
    fn payload_len(&self) -> u32 {
        self.payload_len
    }
}

pub type DeltaRecord = Record<DeltaHeader>;

/// The delta buffer proper: pushed to by `emit_delta` during any phase,
/// canonicalized and drained by `commit_apply` during COMMIT.
pub struct DeltaBuffer {
    inner: RecordBuffer<DeltaHeader>,
}

impl DeltaBuffer {
    pub fn reserve(capacity_records: usize, capacity_bytes: usize) -> Self {
        DeltaBuffer {
            inner: RecordBuffer::reserve(capacity_records, capacity_bytes),
        }
    }

    pub fn begin_tick(&mut self, tick: TickIndex) {
        self.inner.begin_tick(tick);
    }

    pub fn push(&mut self, key: OrderingKey, tick: TickIndex, payload: &[u8]) -> PushOutcome {
        self.inner.push(
            DeltaHeader {
                tick,
                key,
                payload_len: payload.len() as u32,
            },
            payload,
        )
    }

    /// Sort records by `OrderingKey` then `insert_index` — the canonical
    /// order `commit_apply` relies on.
    pub fn canonize(&mut self) {
        self.inner
            .sort_by(|a, b| a.header.key.cmp(&b.header.key).then(a.insert_index.cmp(&b.insert_index)));
    }

    pub fn records(&self) -> &[DeltaRecord] {
        self.inner.records()
    }

    pub fn arena(&self) -> &[u8] {
        self.inner.arena()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn refused_capacity(&self) -> u64 {
        self.inner.refused_capacity()
    }

    pub fn refused_arena(&self) -> u64 {
        self.inner.refused_arena()
    }

    /// `true` iff records are already non-decreasing by `(key,
    /// insert_index)` — the debug-build check `commit_apply` performs
    /// after sorting.
    pub fn is_canonical(&self) -> bool {
        self.inner
            .records()
            .windows(2)
            .all(|w| (w[0].header.key, w[0].insert_index) <= (w[1].header.key, w[1].insert_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::ids::{ChunkId, ComponentId, DomainId, EntityId, Seq, TypeId64};
    use lockstep_core::order::Phase;

    fn key(entity: u64, seq: u32) -> OrderingKey {
        OrderingKey::make(
            Phase::Commit,
            DomainId::ZERO,
            ChunkId::ZERO,
            EntityId::new(entity),
            ComponentId::ZERO,
            TypeId64::ZERO,
            Seq(seq),
        )
    }

    #[test]
    fn canonize_sorts_by_key_then_insert_index_regardless_of_push_order() {
        let mut buf = DeltaBuffer::reserve(8, 64);
        buf.begin_tick(TickIndex::ZERO);
        buf.push(key(3, 0), TickIndex::ZERO, b"c");
        buf.push(key(1, 0), TickIndex::ZERO, b"a");
        buf.push(key(2, 0), TickIndex::ZERO, b"b");
        buf.canonize();
        assert!(buf.is_canonical());
        let payloads: Vec<u8> = buf
            .records()
            .iter()
            .map(|r| r.payload(buf.arena())[0])
            .collect();
        assert_eq!(payloads, vec![b'a', b'b', b'c']);
    }

    #[test]
    fn push_rejects_mismatched_tick() {
        let mut buf = DeltaBuffer::reserve(8, 64);
        buf.begin_tick(TickIndex::new(2));
        let outcome = buf.push(key(1, 0), TickIndex::new(1), b"x");
        assert_eq!(outcome, PushOutcome::RefusedBadTick);
    }

    #[test]
    fn full_capacity_increments_refusal_counter() {
        let mut buf = DeltaBuffer::reserve(1, 64);
        buf.begin_tick(TickIndex::ZERO);
        buf.push(key(1, 0), TickIndex::ZERO, b"x");
        let outcome = buf.push(key(2, 0), TickIndex::ZERO, b"y");
        assert_eq!(outcome, PushOutcome::RefusedCapacity);
        assert_eq!(buf.refused_capacity(), 1);
    }
}
