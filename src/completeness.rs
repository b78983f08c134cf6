use std::collections::BTreeSet;

use serde::Serialize;

use crate::db::models::PhaseSegment;
use crate::phases::{Phase, PhaseCategory};

/// How much of the canonical phase lifecycle a vessel-cycle covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletenessLabel {
    RawOnly,
    Phased,
    Completed,
}

impl CompletenessLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletenessLabel::RawOnly => "RAW_ONLY",
            CompletenessLabel::Phased => "PHASED",
            CompletenessLabel::Completed => "COMPLETED",
        }
    }
}

/// Accumulated evidence for one vessel-cycle: which phases were seen and how
/// many positive hours landed in each core bucket.
///
/// A forced Departure segment is a Berthing dwell under a different label,
/// so its hours credit the Berthing bucket and it does not count as a
/// departure observation. Only a genuine Departure-family status sets
/// `departure_seen`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRollup {
    pub phases_seen: BTreeSet<String>,
    pub waiting_hours: f64,
    pub approaching_hours: f64,
    pub berthing_hours: f64,
    pub departure_seen: bool,
}

impl CycleRollup {
    pub fn note(&mut self, phase: &Phase, forced: bool, hours: f64) {
        if forced {
            self.berthing_hours += hours;
            self.phases_seen.insert("Berthing".to_string());
            return;
        }
        match phase.category() {
            Some(PhaseCategory::Waiting) => self.waiting_hours += hours,
            Some(PhaseCategory::Approaching) => self.approaching_hours += hours,
            Some(PhaseCategory::Berthing) => self.berthing_hours += hours,
            Some(PhaseCategory::Departure) => self.departure_seen = true,
            None => {}
        }
        self.phases_seen.insert(phase.as_label().to_string());
    }

    fn has_core_phases(&self) -> bool {
        self.waiting_hours > 0.0 && self.approaching_hours > 0.0 && self.berthing_hours > 0.0
    }
}

/// Derive a cycle rollup fresh from persisted segments. Never cached: a
/// reprocessing run that touches later cycles must not leave stale labels
/// on earlier ones.
pub fn rollup_segments(segments: &[PhaseSegment]) -> CycleRollup {
    let mut rollup = CycleRollup::default();
    for segment in segments {
        rollup.note(&segment.phase, segment.forced, segment.duration_hours);
    }
    rollup
}

/// COMPLETED needs positive hours in all three core buckets plus a genuine
/// departure observation; PHASED has the buckets but no departure; anything
/// less is RAW_ONLY.
pub fn classify(rollup: &CycleRollup) -> CompletenessLabel {
    if rollup.has_core_phases() {
        if rollup.departure_seen {
            CompletenessLabel::Completed
        } else {
            CompletenessLabel::Phased
        }
    } else {
        CompletenessLabel::RawOnly
    }
}
