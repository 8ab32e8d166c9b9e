//! Due-event scheduler (§4.13): a client-facing adapter, not part of the
//! kernel's determinism contract, but entries are still processed in a
//! fixed order — by `next_due_tick`, ties broken by registration handle.

use lockstep_core::ids::TickIndex;

/// `{ next_due_tick(now) -> tick | NONE, process_until(target) -> Ok | Err }`
/// (§6). `next_due_tick` returning `None` means this entry has nothing
/// pending.
pub trait DueEntry {
    fn next_due_tick(&self, now: TickIndex) -> Option<TickIndex>;
    fn process_until(&mut self, target: TickIndex) -> Result<(), ()>;
}

/// A stable registration handle: entries due at the same tick are
/// processed in ascending handle order, never insertion-coincidental
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DueHandle(pub u64);

pub struct DueScheduler {
    next_handle: u64,
    entries: Vec<(DueHandle, Box<dyn DueEntry>)>,
}

impl DueScheduler {
    pub fn new() -> Self {
        DueScheduler {
            next_handle: 0,
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, entry: Box<dyn DueEntry>) -> DueHandle {
        let handle = DueHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entries.push((handle, entry));
        handle
    }

    /// Processes every entry whose `next_due_tick(target_tick) <=
    /// target_tick`, in ascending `DueHandle` order. Entries without any
    /// work due are skipped, not removed — they remain registered for
    /// future advances.
    pub fn advance(&mut self, target_tick: TickIndex) {
        let mut due: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (_, entry))| {
                entry
                    .next_due_tick(target_tick)
                    .is_some_and(|t| t <= target_tick)
            })
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| self.entries[i].0);
        for i in due {
            let _ = self.entries[i].1.process_until(target_tick);
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for DueScheduler {
    fn default() -> Self {
        Self::new()
    }
}
