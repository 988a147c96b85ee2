//! Song structure and the tick-keyed event schedule.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::event::Event;
use crate::patch::{Drum, Patch};

/// The song format version this engine understands.
pub const CURRENT_VERSION: u16 = 3;

/// A decoded song: the event schedule plus the instrument bank it
/// references.
///
/// The schedule is a flat array sorted by tick; events sharing a tick
/// keep the order they had in the file. Lookups scan the equal range
/// found by binary search, so playback never touches the heap.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Format version (0 until the stream's Version record is seen)
    pub version: u16,
    /// Tick at which the song ends and playback wraps
    pub ticks_end: u32,
    /// Tempo: ticks of song time per second of real time
    pub ticks_per_second: u32,
    /// Event schedule, sorted by tick
    pub events: Vec<(u32, Event)>,
    /// Melodic patches keyed by program number
    pub patches: BTreeMap<u8, Patch>,
    /// Drum patches keyed by note number
    pub drums: BTreeMap<u8, Drum>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            // sentinel != CURRENT_VERSION; streams missing a Version record never play
            version: 0,
            ticks_end: 0,
            ticks_per_second: 0,
            events: Vec::new(),
            patches: BTreeMap::new(),
            drums: BTreeMap::new(),
        }
    }
}

impl Song {
    /// All events scheduled at exactly `tick`, in file order.
    pub fn events_at(&self, tick: u32) -> &[(u32, Event)] {
        let start = self.events.partition_point(|&(t, _)| t < tick);
        let len = self.events[start..].partition_point(|&(t, _)| t == tick);
        &self.events[start..start + len]
    }

    /// Restore schedule order after out-of-order insertion.
    ///
    /// The sort is stable, so events sharing a tick keep their insertion
    /// order.
    pub fn sort_events(&mut self) {
        self.events.sort_by_key(|&(t, _)| t);
    }

    /// Song length in seconds, or 0 when the tempo is unset.
    pub fn seconds_end(&self) -> f32 {
        if self.ticks_per_second == 0 {
            0.0
        } else {
            self.ticks_end as f32 / self.ticks_per_second as f32
        }
    }
}
