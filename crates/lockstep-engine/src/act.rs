//! ACTION phase: the intent buffer and action registry/dispatch (§4.5,
//! §4.9 step 3).

use crate::buffer::{PushOutcome, Record, RecordBuffer, RecordHeader};
use crate::commit::DeltaRegistry;
use crate::delta::DeltaBuffer;
use crate::registry::SortedRegistry;
use lockstep_core::ids::{ChunkId, DomainId, EntityId, TickIndex, TypeId64};
use lockstep_core::order::{OrderingKey, Phase};

/// Intent header. Canonical order is `(tick, src_entity, type_id, seq,
/// schema_id, schema_ver, dst_entity, domain_id, chunk_id, payload_len,
/// payload_bytes)` (§4.5) — `src_entity` and `tick` are stamped by the
/// emit callback, never trusted from the mind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentHeader {
    pub tick: TickIndex,
    pub src_entity: EntityId,
    pub type_id: TypeId64,
    pub seq: u32,
    pub schema_id: u64,
    pub schema_ver: u32,
    pub dst_entity: EntityId,
    pub domain_id: DomainId,
    pub chunk_id: ChunkId,
    pub payload_len: u32,
}

impl RecordHeader for IntentHeader {
    fn tick(&self) -> TickIndex {
        self.tick
    }
    fn payload_len(&self) -> u32 {
        self.payload_len
    }
}

pub type IntentRecord = Record<IntentHeader>;

pub struct IntentBuffer {
    inner: RecordBuffer<IntentHeader>,
}

impl IntentBuffer {
    pub fn reserve(capacity_records: usize, capacity_bytes: usize) -> Self {
        IntentBuffer {
            inner: RecordBuffer::reserve(capacity_records, capacity_bytes),
        }
    }

    pub fn begin_tick(&mut self, tick: TickIndex) {
        self.inner.begin_tick(tick);
    }

    pub fn push(&mut self, header: IntentHeader, payload: &[u8]) -> PushOutcome {
        self.inner.push(header, payload)
    }

    /// Sorts by the full intent comparator (§4.5), breaking any remaining
    /// tie by `payload_bytes` — the comparator's last field. Takes a
    /// snapshot of the arena since the comparator needs read access to it
    /// while `sort_by` holds the records mutably borrowed.
    pub fn canonize(&mut self) {
        let arena = self.inner.arena().to_vec();
        self.inner.sort_by(|a, b| {
            let h1 = &a.header;
            let h2 = &b.header;
            (
                h1.tick,
                h1.src_entity,
                h1.type_id,
                h1.seq,
                h1.schema_id,
                h1.schema_ver,
                h1.dst_entity,
                h1.domain_id,
                h1.chunk_id,
                h1.payload_len,
                a.payload(&arena),
            )
                .cmp(&(
                    h2.tick,
                    h2.src_entity,
                    h2.type_id,
                    h2.seq,
                    h2.schema_id,
                    h2.schema_ver,
                    h2.dst_entity,
                    h2.domain_id,
                    h2.chunk_id,
                    h2.payload_len,
                    b.payload(&arena),
                ))
        });
    }

    pub fn records(&self) -> &[IntentRecord] {
        self.inner.records()
    }

    pub fn arena(&self) -> &[u8] {
        self.inner.arena()
    }
}

/// `{ validate?, apply }` (§4.6). `validate` is read-only with respect to
/// world; `apply` may only emit deltas through `emit_delta`, never mutate
/// world directly.
pub trait Action<W> {
    fn validate(&self, _world: &W, _intent: &IntentHeader, _payload: &[u8]) -> bool {
        true
    }

    fn apply(
        &self,
        world: &W,
        intent: &IntentHeader,
        payload: &[u8],
        emit_delta: &mut dyn FnMut(Phase, ChunkId, DomainId, lockstep_core::ids::ComponentId, &[u8]),
    );
}

pub type ActionRegistry<W> = SortedRegistry<u64, Box<dyn Action<W>>>;

/// Iterates canonicalized intents and dispatches each to its action
/// handler, emitting deltas into `delta_buffer`. The per-dispatch `seq`
/// counter resets once per call (once per ACTION phase), not per intent.
pub fn dispatch_to_deltas<W>(
    registry: &ActionRegistry<W>,
    world: &W,
    intents: &IntentBuffer,
    delta_buffer: &mut DeltaBuffer,
) {
    let mut next_dispatch_seq: u32 = 0;
    let arena = intents.arena();
    for record in intents.records() {
        let header = record.header;
        let payload = record.payload(arena);
        let Some(handler) = registry.find(header.type_id.get()) else {
            continue;
        };
        if !handler.validate(world, &header, payload) {
            continue;
        }
        let tick = header.tick;
        let mut emit = |phase: Phase,
                        chunk_id: ChunkId,
                        domain_id: DomainId,
                        component_id: lockstep_core::ids::ComponentId,
                        delta_payload: &[u8]| {
            let key = OrderingKey::make(
                phase,
                domain_id,
                chunk_id,
                header.dst_entity,
                component_id,
                header.type_id,
                lockstep_core::ids::Seq(next_dispatch_seq),
            );
            next_dispatch_seq = next_dispatch_seq.wrapping_add(1);
            delta_buffer.push(key, tick, delta_payload);
        };
        handler.apply(world, &header, payload, &mut emit);
    }
}
