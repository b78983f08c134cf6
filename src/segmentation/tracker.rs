use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::completeness::CycleRollup;
use crate::phases::Phase;

/// Mutable scan state for the single vessel currently being processed.
///
/// Exclusively owned by the engine for the duration of one scan and
/// discarded afterwards; nothing here is shared across vessels.
#[derive(Debug)]
pub struct CycleTracker {
    /// Raw classifier status of the open segment, if any.
    pub current_status: Option<String>,
    pub segment_start: Option<DateTime<Utc>>,
    /// End of the most recently closed segment; drives idle-gap detection.
    pub last_segment_end: Option<DateTime<Utc>>,
    pub cycle: u32,
    pub skip_vessel: bool,
    cycles: BTreeMap<u32, CycleRollup>,
}

impl CycleTracker {
    pub fn new() -> Self {
        Self {
            current_status: None,
            segment_start: None,
            last_segment_end: None,
            cycle: 1,
            skip_vessel: false,
            cycles: BTreeMap::new(),
        }
    }

    /// Open a fresh segment at `at` under the current cycle.
    pub fn open_segment(&mut self, status: String, at: DateTime<Utc>) {
        self.current_status = Some(status);
        self.segment_start = Some(at);
    }

    /// Start a new TRT cycle after an idle gap. Clears the open segment and
    /// the last close marker so the split cannot re-fire before the next
    /// segment closes.
    pub fn split_cycle(&mut self) -> u32 {
        self.cycle += 1;
        self.current_status = None;
        self.segment_start = None;
        self.last_segment_end = None;
        self.cycle
    }

    /// Record an emitted segment in the current cycle's rollup.
    pub fn note_emitted(&mut self, phase: &Phase, forced: bool, hours: f64) {
        self.cycles
            .entry(self.cycle)
            .or_default()
            .note(phase, forced, hours);
    }

    pub fn into_cycles(self) -> BTreeMap<u32, CycleRollup> {
        self.cycles
    }
}

impl Default for CycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn split_resets_open_segment_and_close_marker() {
        let mut tracker = CycleTracker::new();
        let t0 = Utc.with_ymd_and_hms(2025, 4, 26, 7, 0, 0).unwrap();
        tracker.open_segment("Anchoring".to_string(), t0);
        tracker.last_segment_end = Some(t0);

        assert_eq!(tracker.split_cycle(), 2);
        assert!(tracker.current_status.is_none());
        assert!(tracker.segment_start.is_none());
        assert!(tracker.last_segment_end.is_none());
    }

    #[test]
    fn rollups_accumulate_per_cycle() {
        let mut tracker = CycleTracker::new();
        tracker.note_emitted(&Phase::normalize("Anchoring"), false, 2.0);
        tracker.split_cycle();
        tracker.note_emitted(&Phase::normalize("Berthing"), false, 5.0);

        let cycles = tracker.into_cycles();
        assert_eq!(cycles.len(), 2);
        assert!((cycles[&1].waiting_hours - 2.0).abs() < f64::EPSILON);
        assert!((cycles[&2].berthing_hours - 5.0).abs() < f64::EPSILON);
    }
}
