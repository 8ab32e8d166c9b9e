//! Per-scope integer work budgets with lossless deferral.
//!
//! Grounded closely on the reference budget table: sorted domain/chunk rows,
//! binary-search lookup, `u32::MAX` as the "unlimited" sentinel, and
//! all-or-nothing `try_consume` — global, domain, and chunk remaining must
//! *all* cover the request before any counter moves. Failure must never be
//! used by a caller to skip ahead to cheaper work; that would make
//! scheduling depend on runtime cost and break determinism.

use crate::ids::{ChunkId, DomainId, TickIndex};

/// Unlimited budget sentinel for a scope's limit.
pub const UNLIMITED: u32 = u32::MAX;

/// The `(domain, chunk)` pair a unit of work is charged against. A zero id
/// means "no domain scope" / "no chunk scope" and is not charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BudgetScope {
    pub domain: DomainId,
    pub chunk: ChunkId,
}

impl BudgetScope {
    pub const NONE: BudgetScope = BudgetScope {
        domain: DomainId::ZERO,
        chunk: ChunkId::ZERO,
    };

    pub fn domain(domain: DomainId) -> Self {
        BudgetScope {
            domain,
            chunk: ChunkId::ZERO,
        }
    }

    pub fn domain_chunk(domain: DomainId, chunk: ChunkId) -> Self {
        BudgetScope { domain, chunk }
    }
}

struct Row {
    id: u64,
    limit: u32,
    used: u32,
}

#[inline]
fn remaining_of(limit: u32, used: u32) -> u32 {
    if limit == UNLIMITED {
        UNLIMITED
    } else {
        limit.saturating_sub(used)
    }
}

/// A sorted, capacity-bounded per-scope work budget.
pub struct Budget {
    domain_cap: usize,
    chunk_cap: usize,
    domain_default: u32,
    chunk_default: u32,
    global_limit: u32,
    global_used: u32,
    domain_rows: Vec<Row>,
    chunk_rows: Vec<Row>,
    probe_domain_overflow: u64,
    probe_chunk_overflow: u64,
}

impl Budget {
    /// Allocate the domain/chunk tables once, at setup time.
    pub fn reserve(domain_cap: usize, chunk_cap: usize) -> Self {
        Budget {
            domain_cap,
            chunk_cap,
            domain_default: UNLIMITED,
            chunk_default: UNLIMITED,
            global_limit: UNLIMITED,
            global_used: 0,
            domain_rows: Vec::with_capacity(domain_cap),
            chunk_rows: Vec::with_capacity(chunk_cap),
            probe_domain_overflow: 0,
            probe_chunk_overflow: 0,
        }
    }

    /// Zero every `used` counter for the new tick. Limits are untouched.
    /// `tick` is accepted for parity with the scheduler's per-phase call
    /// site but carries no stored state here.
    pub fn begin_tick(&mut self, _tick: TickIndex) {
        self.global_used = 0;
        for row in &mut self.domain_rows {
            row.used = 0;
        }
        for row in &mut self.chunk_rows {
            row.used = 0;
        }
    }

    pub fn set_limits(&mut self, global: u32, domain_default: u32, chunk_default: u32) {
        self.global_limit = global;
        self.domain_default = domain_default;
        self.chunk_default = chunk_default;
    }

    fn get_or_insert_domain(&mut self, id: DomainId) -> Option<usize> {
        match self.domain_rows.binary_search_by_key(&id.get(), |r| r.id) {
            Ok(idx) => Some(idx),
            Err(pos) => {
                if self.domain_rows.len() >= self.domain_cap {
                    None
                } else {
                    self.domain_rows.insert(
                        pos,
                        Row {
                            id: id.get(),
                            limit: self.domain_default,
                            used: 0,
                        },
                    );
                    Some(pos)
                }
            }
        }
    }

    fn get_or_insert_chunk(&mut self, id: ChunkId) -> Option<usize> {
        match self.chunk_rows.binary_search_by_key(&id.get(), |r| r.id) {
            Ok(idx) => Some(idx),
            Err(pos) => {
                if self.chunk_rows.len() >= self.chunk_cap {
                    None
                } else {
                    self.chunk_rows.insert(
                        pos,
                        Row {
                            id: id.get(),
                            limit: self.chunk_default,
                            used: 0,
                        },
                    );
                    Some(pos)
                }
            }
        }
    }

    pub fn set_domain_limit(&mut self, id: DomainId, limit: u32) -> bool {
        match self.get_or_insert_domain(id) {
            Some(idx) => {
                self.domain_rows[idx].limit = limit;
                true
            }
            None => {
                self.probe_domain_overflow += 1;
                false
            }
        }
    }

    pub fn set_chunk_limit(&mut self, id: ChunkId, limit: u32) -> bool {
        match self.get_or_insert_chunk(id) {
            Some(idx) => {
                self.chunk_rows[idx].limit = limit;
                true
            }
            None => {
                self.probe_chunk_overflow += 1;
                false
            }
        }
    }

    /// All-or-nothing: `true` iff global *and* domain (if scoped) *and*
    /// chunk (if scoped) all have `units` remaining. On success every
    /// applicable `used` counter advances by `units`, saturating. On
    /// failure nothing changes.
    pub fn try_consume(&mut self, scope: BudgetScope, units: u32) -> bool {
        if remaining_of(self.global_limit, self.global_used) < units {
            return false;
        }

        let domain_idx = if !scope.domain.is_zero() {
            match self.get_or_insert_domain(scope.domain) {
                Some(idx) => {
                    if remaining_of(self.domain_rows[idx].limit, self.domain_rows[idx].used) < units {
                        return false;
                    }
                    Some(idx)
                }
                None => {
                    self.probe_domain_overflow += 1;
                    tracing::warn!(domain = scope.domain.get(), "try_consume refused: domain table full");
                    return false;
                }
            }
        } else {
            None
        };

        let chunk_idx = if !scope.chunk.is_zero() {
            match self.get_or_insert_chunk(scope.chunk) {
                Some(idx) => {
                    if remaining_of(self.chunk_rows[idx].limit, self.chunk_rows[idx].used) < units {
                        return false;
                    }
                    Some(idx)
                }
                None => {
                    self.probe_chunk_overflow += 1;
                    tracing::warn!(chunk = scope.chunk.get(), "try_consume refused: chunk table full");
                    return false;
                }
            }
        } else {
            None
        };

        self.global_used = self.global_used.saturating_add(units);
        if let Some(idx) = domain_idx {
            self.domain_rows[idx].used = self.domain_rows[idx].used.saturating_add(units);
        }
        if let Some(idx) = chunk_idx {
            self.chunk_rows[idx].used = self.chunk_rows[idx].used.saturating_add(units);
        }
        true
    }

    /// Minimum of the applicable remaining values for `scope`.
    pub fn remaining(&mut self, scope: BudgetScope) -> u32 {
        let mut m = remaining_of(self.global_limit, self.global_used);
        if !scope.domain.is_zero() {
            match self.get_or_insert_domain(scope.domain) {
                Some(idx) => {
                    m = m.min(remaining_of(self.domain_rows[idx].limit, self.domain_rows[idx].used));
                }
                None => {
                    self.probe_domain_overflow += 1;
                    m = 0;
                }
            }
        }
        if !scope.chunk.is_zero() {
            match self.get_or_insert_chunk(scope.chunk) {
                Some(idx) => {
                    m = m.min(remaining_of(self.chunk_rows[idx].limit, self.chunk_rows[idx].used));
                }
                None => {
                    self.probe_chunk_overflow += 1;
                    m = 0;
                }
            }
        }
        m
    }

    pub fn probe_domain_overflow(&self) -> u64 {
        self.probe_domain_overflow
    }

    pub fn probe_chunk_overflow(&self) -> u64 {
        self.probe_chunk_overflow
    }
}
