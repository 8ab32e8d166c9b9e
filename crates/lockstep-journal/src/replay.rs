//! Per-tick state hash ([`HashCtx`]) and the parallel trace recorder
//! ([`ReplayCtx`]) the phase scheduler drives alongside it.
//!
//! Grounded on the reference scheduler's hash context (phase begin/end
//! counters plus an FNV-1a64 `deltas_hash` rollup) and its replay stub,
//! which mirrors the same shape with no hashing — "a hook for trace
//! recording" with no defined persistence format. That silence is read as
//! license to give it one here: [`ReplayLog`] is the bincode-serialized,
//! blake3-checksummed form `ReplayCtx` accumulates into.

use lockstep_core::hash::fnv1a64;
use lockstep_core::ids::{ComponentId, TickIndex};
use lockstep_core::order::{OrderingKey, Phase, PHASE_COUNT};
use serde::{Deserialize, Serialize};

/// The state hash exposed per tick: phase begin/end counts, total
/// committed deltas, and the FNV-1a64 `deltas_hash` rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHash {
    pub phase_begin_count: [u64; PHASE_COUNT],
    pub phase_end_count: [u64; PHASE_COUNT],
    pub deltas_committed: u32,
    pub deltas_hash: u64,
}

/// Computes the authoritative per-tick [`StateHash`] as the scheduler drives
/// phases. One `HashCtx` per tick (or reset via [`HashCtx::begin_tick`]).
#[derive(Debug, Clone)]
pub struct HashCtx {
    phase_begin_count: [u64; PHASE_COUNT],
    phase_end_count: [u64; PHASE_COUNT],
    deltas_committed: u32,
    deltas_hash: u64,
}

impl Default for HashCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl HashCtx {
    pub fn new() -> Self {
        HashCtx {
            phase_begin_count: [0; PHASE_COUNT],
            phase_end_count: [0; PHASE_COUNT],
            deltas_committed: 0,
            deltas_hash: fnv1a64(&[]),
        }
    }

    /// Zero every counter and reset `deltas_hash` to the FNV-1a64 offset
    /// basis. Called once at the start of each tick.
    pub fn begin_tick(&mut self) {
        *self = Self::new();
    }

    pub fn phase_begin(&mut self, phase: Phase) {
        self.phase_begin_count[phase.index()] += 1;
    }

    pub fn phase_end(&mut self, phase: Phase) {
        self.phase_end_count[phase.index()] += 1;
    }

    /// Fold one committed delta's `phase:u16 ‖ component_id:u64 ‖
    /// packet_hash:u64` (all LE) into the running `deltas_hash`.
    pub fn record_committed_delta(&mut self, key: &OrderingKey, packet_hash: u64) {
        self.deltas_hash =
            fold_into(self.deltas_hash, key.phase, key.component_id, packet_hash);
        self.deltas_committed += 1;
    }

    pub fn snapshot(&self) -> StateHash {
        StateHash {
            phase_begin_count: self.phase_begin_count,
            phase_end_count: self.phase_end_count,
            deltas_committed: self.deltas_committed,
            deltas_hash: self.deltas_hash,
        }
    }
}

fn fold_into(h: u64, phase: u16, component_id: ComponentId, packet_hash: u64) -> u64 {
    let mut state = lockstep_core::hash::fnv1a64_update_bytes(h, &phase.to_le_bytes());
    state = lockstep_core::hash::fnv1a64_update_bytes(state, &component_id.get().to_le_bytes());
    state = lockstep_core::hash::fnv1a64_update_bytes(state, &packet_hash.to_le_bytes());
    state
}

/// One committed delta's record in a persisted replay trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedDeltaEntry {
    pub phase: u16,
    pub component_id: u64,
    pub packet_hash: u64,
}

/// One tick's worth of replay trace: phase counters plus every delta
/// committed, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTrace {
    pub tick: u64,
    pub phase_begin_count: [u64; PHASE_COUNT],
    pub phase_end_count: [u64; PHASE_COUNT],
    pub committed: Vec<CommittedDeltaEntry>,
}

/// A parallel-shape, non-hashing trace recorder. Same call sites as
/// [`HashCtx`] (`phase_begin`/`phase_end`/`record_committed_delta`), but
/// instead of folding into a rollup it appends a full record — built for
/// offline replay/debugging, not for the determinism witness itself.
#[derive(Debug, Clone, Default)]
pub struct ReplayCtx {
    tick: u64,
    phase_begin_count: [u64; PHASE_COUNT],
    phase_end_count: [u64; PHASE_COUNT],
    committed: Vec<CommittedDeltaEntry>,
    log: ReplayLog,
}

impl ReplayCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_tick(&mut self, tick: TickIndex) {
        self.tick = tick.get();
        self.phase_begin_count = [0; PHASE_COUNT];
        self.phase_end_count = [0; PHASE_COUNT];
        self.committed.clear();
    }

    pub fn phase_begin(&mut self, phase: Phase) {
        self.phase_begin_count[phase.index()] += 1;
    }

    pub fn phase_end(&mut self, phase: Phase) {
        self.phase_end_count[phase.index()] += 1;
    }

    pub fn record_committed_delta(&mut self, key: &OrderingKey, packet_hash: u64) {
        self.committed.push(CommittedDeltaEntry {
            phase: key.phase,
            component_id: key.component_id.get(),
            packet_hash,
        });
    }

    /// Seal the current tick's trace into the accumulated [`ReplayLog`].
    pub fn end_tick(&mut self) {
        self.log.ticks.push(TickTrace {
            tick: self.tick,
            phase_begin_count: self.phase_begin_count,
            phase_end_count: self.phase_end_count,
            committed: std::mem::take(&mut self.committed),
        });
    }

    pub fn log(&self) -> &ReplayLog {
        &self.log
    }

    pub fn into_log(self) -> ReplayLog {
        self.log
    }
}

/// A persisted, append-only trace of every tick's phase counters and
/// committed deltas, for offline replay or divergence debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub ticks: Vec<TickTrace>,
}

impl ReplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize with bincode and return the bytes alongside a blake3
    /// whole-blob integrity hash. The FNV-1a64 `deltas_hash` inside each
    /// [`TickTrace`] remains the determinism witness; this hash only
    /// guards the log file against transport/storage corruption.
    pub fn to_bytes_with_integrity(&self) -> Result<(Vec<u8>, blake3::Hash), crate::error::JournalError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| crate::error::JournalError::Encode { reason: e.to_string() })?;
        let hash = blake3::hash(&bytes);
        Ok((bytes, hash))
    }

    /// Verify `bytes` against `expected` before deserializing.
    pub fn from_bytes_verified(bytes: &[u8], expected: blake3::Hash) -> Result<Self, crate::error::JournalError> {
        let actual = blake3::hash(bytes);
        if actual != expected {
            tracing::warn!("replay log integrity check failed");
            return Err(crate::error::JournalError::IntegrityMismatch);
        }
        let (log, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| crate::error::JournalError::Decode { reason: e.to_string() })?;
        Ok(log)
    }

    /// Render as pretty-printed JSON, for a human to read during divergence
    /// debugging. The bincode form in [`Self::to_bytes_with_integrity`]
    /// remains the format actually persisted to disk.
    pub fn to_json_pretty(&self) -> Result<String, crate::error::JournalError> {
        serde_json::to_string_pretty(self).map_err(|e| crate::error::JournalError::Encode { reason: e.to_string() })
    }

    /// Parse a log previously rendered by [`Self::to_json_pretty`].
    pub fn from_json(text: &str) -> Result<Self, crate::error::JournalError> {
        serde_json::from_str(text).map_err(|e| crate::error::JournalError::Decode { reason: e.to_string() })
    }
}
