//! FNV-1a64 hashing.
//!
//! Hand-rolled rather than pulled from a crate: this exact algorithm backs
//! `deltas_hash` and the commit `ordering_checksum`, and it is five lines
//! of arithmetic, not something the dependency corpus reaches for
//! (`blake3` is used elsewhere in this workspace for unrelated whole-blob
//! integrity hashing, not for these field-folded rollups).

/// The FNV-1a64 offset basis. Also the initial value of `deltas_hash` and of
/// `ordering_checksum` before any bytes are folded in.
pub const FNV1A64_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fold a byte slice into a running FNV-1a64 hash.
#[inline]
pub fn fnv1a64_update_bytes(mut h: u64, data: &[u8]) -> u64 {
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(FNV1A64_PRIME);
    }
    h
}

/// Hash a single byte slice from the offset basis.
pub fn fnv1a64(data: &[u8]) -> u64 {
    fnv1a64_update_bytes(FNV1A64_OFFSET_BASIS, data)
}

/// Incremental FNV-1a64 accumulator, for folding heterogeneous fields one at
/// a time (as the commit checksum and `deltas_hash` rollups do).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fnv1a64 {
    state: u64,
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Fnv1a64 {
    pub fn new() -> Self {
        Fnv1a64 {
            state: FNV1A64_OFFSET_BASIS,
        }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state = fnv1a64_update_bytes(self.state, data);
        self
    }

    pub fn update_u16_le(&mut self, v: u16) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn update_u32_le(&mut self, v: u32) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn update_u64_le(&mut self, v: u64) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn finish(&self) -> u64 {
        self.state
    }
}
