use std::sync::Mutex;

use firetest_types::temporal::wall_clock_ms;
use firetest_types::TemporalAnchor;

/// Internal mutable state of the Hybrid Logical Clock.
struct HlcState {
    /// Last-issued physical millisecond timestamp.
    physical_ms: u64,
    /// Logical counter for readings within the same physical millisecond.
    logical: u32,
}

/// Hybrid Logical Clock for ordering changes and naming generated children.
///
/// - `physical = max(wall_clock, state.physical)`.
/// - If physical advanced, `logical = 0`; otherwise `logical += 1`.
/// - Readings are strictly increasing, even if the wall clock stalls or
///   steps backwards.
pub struct HybridLogicalClock {
    state: Mutex<HlcState>,
}

impl HybridLogicalClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HlcState {
                physical_ms: 0,
                logical: 0,
            }),
        }
    }

    /// Next reading, strictly greater than every earlier one from this clock.
    pub fn now(&self) -> TemporalAnchor {
        let wall = wall_clock_ms();
        let mut state = self.state.lock().expect("HLC mutex poisoned");

        let new_physical = wall.max(state.physical_ms);
        let new_logical = if new_physical > state.physical_ms {
            0
        } else {
            state.logical + 1
        };

        state.physical_ms = new_physical;
        state.logical = new_logical;

        TemporalAnchor::new(new_physical, new_logical)
    }

    /// The most recent reading, without advancing.
    pub fn last(&self) -> TemporalAnchor {
        let state = self.state.lock().expect("HLC mutex poisoned");
        TemporalAnchor::new(state.physical_ms, state.logical)
    }
}

impl Default for HybridLogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HybridLogicalClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridLogicalClock")
            .field("last", &self.last())
            .finish()
    }
}
