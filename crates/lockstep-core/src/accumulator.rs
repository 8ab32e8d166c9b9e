//! Lossless owed-work accumulators (§4.4).
//!
//! A propagator owes integer work each tick; `add` extends the owed value,
//! `apply` pays out as many quanta as the budget allows and shrinks `owed`
//! by exactly what was paid. Because nothing is paid that wasn't owed, and
//! nothing owed disappears without being paid, total paid work over any
//! tick window equals total owed work — work is delayed, never lost.
//!
//! No header in the example corpus defines this type's exact C shape, so
//! this module is built directly from the semantics above rather than
//! ported from a reference file (see DESIGN.md).

use crate::ids::TickIndex;

/// Which component of a vector/quaternion accumulator a payout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Scalar,
    X,
    Y,
    Z,
    W,
}

/// A single owed-work ledger for one scalar quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    owed: i64,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator { owed: 0 }
    }

    /// Extend the owed value by an integer delta. `tick` is accepted for
    /// parity with the call site and future diagnostics; it does not gate
    /// the add.
    pub fn add(&mut self, delta: i64, _tick: TickIndex) {
        self.owed = self.owed.saturating_add(delta);
    }

    pub fn owed(&self) -> i64 {
        self.owed
    }

    pub fn is_empty(&self) -> bool {
        self.owed == 0
    }

    /// Pay out as many quanta as fit in `budget_units`. Calls `apply_cb`
    /// exactly once with the amount paid if, and only if, that amount is
    /// nonzero, and returns the units actually used. A negative `owed`
    /// balance is never paid down by a positive budget — it waits for a
    /// compensating `add`.
    pub fn apply(&mut self, mut apply_cb: impl FnMut(Component, i64), budget_units: u32) -> u32 {
        if self.owed <= 0 {
            return 0;
        }
        let payout = self.owed.min(budget_units as i64);
        if payout > 0 {
            apply_cb(Component::Scalar, payout);
            self.owed -= payout;
        }
        payout as u32
    }
}

/// Three independent scalar ledgers paid from one shared budget, in `x, y,
/// z` order — each component's shortfall does not starve the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulatorVec3 {
    pub x: Accumulator,
    pub y: Accumulator,
    pub z: Accumulator,
}

impl AccumulatorVec3 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, delta: (i64, i64, i64), tick: TickIndex) {
        self.x.add(delta.0, tick);
        self.y.add(delta.1, tick);
        self.z.add(delta.2, tick);
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty() && self.z.is_empty()
    }

    pub fn apply(&mut self, mut apply_cb: impl FnMut(Component, i64), budget_units: u32) -> u32 {
        let mut remaining = budget_units;
        let mut used = 0u32;
        for (component, acc) in [
            (Component::X, &mut self.x),
            (Component::Y, &mut self.y),
            (Component::Z, &mut self.z),
        ] {
            let paid = acc.apply(|_, delta| apply_cb(component, delta), remaining);
            remaining = remaining.saturating_sub(paid);
            used = used.saturating_add(paid);
        }
        used
    }
}

/// Four independent scalar ledgers (`w, x, y, z`) for quaternion-valued
/// owed work, paid in the same per-component, shared-budget fashion.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulatorQuat {
    pub w: Accumulator,
    pub x: Accumulator,
    pub y: Accumulator,
    pub z: Accumulator,
}

impl AccumulatorQuat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, delta: (i64, i64, i64, i64), tick: TickIndex) {
        self.w.add(delta.0, tick);
        self.x.add(delta.1, tick);
        self.y.add(delta.2, tick);
        self.z.add(delta.3, tick);
    }

    pub fn is_empty(&self) -> bool {
        self.w.is_empty() && self.x.is_empty() && self.y.is_empty() && self.z.is_empty()
    }

    pub fn apply(&mut self, mut apply_cb: impl FnMut(Component, i64), budget_units: u32) -> u32 {
        let mut remaining = budget_units;
        let mut used = 0u32;
        for (component, acc) in [
            (Component::W, &mut self.w),
            (Component::X, &mut self.x),
            (Component::Y, &mut self.y),
            (Component::Z, &mut self.z),
        ] {
            let paid = acc.apply(|_, delta| apply_cb(component, delta), remaining);
            remaining = remaining.saturating_sub(paid);
            used = used.saturating_add(paid);
        }
        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_pays_at_most_budget_and_shrinks_owed() {
        let mut acc = Accumulator::new();
        acc.add(10, TickIndex::ZERO);
        let mut paid_total = 0i64;
        let used = acc.apply(|_, d| paid_total += d, 4);
        assert_eq!(used, 4);
        assert_eq!(paid_total, 4);
        assert_eq!(acc.owed(), 6);
        assert!(!acc.is_empty());
    }

    #[test]
    fn apply_never_overpays_owed_amount() {
        let mut acc = Accumulator::new();
        acc.add(3, TickIndex::ZERO);
        let mut paid_total = 0i64;
        let used = acc.apply(|_, d| paid_total += d, 100);
        assert_eq!(used, 3);
        assert_eq!(paid_total, 3);
        assert!(acc.is_empty());
    }

    #[test]
    fn total_paid_equals_total_owed_over_many_small_applies() {
        let mut acc = Accumulator::new();
        acc.add(17, TickIndex::ZERO);
        let mut total_paid = 0i64;
        for _ in 0..20 {
            total_paid += acc.apply(|_, d| assert!(d > 0), 2) as i64;
            if acc.is_empty() {
                break;
            }
        }
        assert_eq!(total_paid, 17);
        assert!(acc.is_empty());
    }

    #[test]
    fn negative_owed_waits_for_compensating_add() {
        let mut acc = Accumulator::new();
        acc.add(-5, TickIndex::ZERO);
        let used = acc.apply(|_, _| panic!("should not pay a negative balance"), 10);
        assert_eq!(used, 0);
        acc.add(8, TickIndex::ZERO);
        assert_eq!(acc.owed(), 3);
    }

    #[test]
    fn vec3_pays_components_in_order_sharing_one_budget() {
        let mut v = AccumulatorVec3::new();
        v.add((5, 5, 5), TickIndex::ZERO);
        let mut seen = Vec::new();
        let used = v.apply(|c, d| seen.push((c, d)), 8);
        assert_eq!(used, 8);
        // x fully paid (5), y gets remaining 3, z gets nothing this round
        assert_eq!(seen, vec![(Component::X, 5), (Component::Y, 3)]);
        assert!(!v.is_empty());
    }
}
