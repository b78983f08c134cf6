use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::phases::Phase;

/// Structured record of a sanity rule firing during a vessel scan.
///
/// These are expected control-flow branches, not errors; the engine returns
/// them alongside the segments so callers can report on them without
/// scraping logs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RuleEvent {
    /// Same status held past the phase cap; the rest of the vessel's scan
    /// was abandoned.
    StuckStatusAbort {
        vessel_id: i64,
        status: String,
        elapsed_secs: i64,
        at: DateTime<Utc>,
    },
    /// Idle gap exceeded the TRT threshold; subsequent segments belong to a
    /// new cycle.
    CycleSplit {
        vessel_id: i64,
        gap_secs: i64,
        cycle: u32,
        at: DateTime<Utc>,
    },
    /// A segment's duration exceeded the phase cap and was clamped.
    DurationCapped {
        vessel_id: i64,
        phase: Phase,
        raw_hours: f64,
        at: DateTime<Utc>,
    },
    /// A candidate segment's natural key was already persisted; skipped.
    DuplicateSkipped {
        vessel_id: i64,
        phase: Phase,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
}
