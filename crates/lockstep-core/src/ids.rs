//! Opaque identifiers.
//!
//! Every id in this system is an externally-assigned 64-bit integer: the
//! caller (world/game layer) hands out `EntityId`s, `DomainId`s, and so on,
//! and the kernel never allocates, recycles, or reasons about their
//! provenance. This is deliberately *not* a generational-handle allocator —
//! there is no `EntityAllocator`, no stale-reference detection, because the
//! kernel does not own entity lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident, $inner:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// The zero value. For most id types this carries no special
            /// meaning beyond "not yet assigned"; `FrameId`'s zero value is
            /// the reserved `WORLD` sentinel (see [`FrameId::WORLD`]).
            pub const ZERO: $name = $name(0);

            #[inline]
            pub const fn new(v: $inner) -> Self {
                $name(v)
            }

            #[inline]
            pub const fn get(self) -> $inner {
                self.0
            }

            #[inline]
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }
    };
}

opaque_id!(TickIndex, u64, "Monotonically increasing tick counter, from 0.");
opaque_id!(DomainId, u64, "Opaque domain identifier; 0 means \"no domain scope\".");
opaque_id!(ChunkId, u64, "Opaque chunk identifier; 0 means \"no chunk scope\".");
opaque_id!(EntityId, u64, "Opaque entity identifier, externally assigned.");
opaque_id!(ComponentId, u64, "Opaque component-type identifier.");
opaque_id!(TypeId64, u64, "Opaque packet/delta/intent type discriminator.");
opaque_id!(PropagatorId, u64, "Opaque propagator identifier, unique within a domain.");
opaque_id!(FrameId, u64, "Opaque coordinate-frame identifier; 0 is the reserved WORLD sentinel.");
opaque_id!(AgentId, u64, "Opaque agent identifier (shares representation with EntityId).");

impl FrameId {
    /// The reserved root frame. Never stored as a node in the frame graph.
    pub const WORLD: FrameId = FrameId(0);

    #[inline]
    pub const fn is_world(self) -> bool {
        self.0 == 0
    }
}

/// A 32-bit sequence number, monotonically assigned by the producer within
/// whatever scope that producer resets it at (see the per-module notes on
/// `seq` reset points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Seq(pub u32);

impl Seq {
    pub const ZERO: Seq = Seq(0);

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the current value and increments in place.
    #[inline]
    pub fn next(&mut self) -> Seq {
        let cur = *self;
        self.0 = self.0.wrapping_add(1);
        cur
    }
}
