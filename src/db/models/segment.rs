use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phases::Phase;

/// A closed span of time during which a vessel stayed in one phase.
///
/// Created by the segmentation engine on a status transition or at end of
/// stream, never mutated afterwards. `forced` marks a Berthing dwell that
/// was relabeled Departure because the vessel left its berth; completeness
/// needs the distinction when rebuilding cycle rollups from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSegment {
    pub id: String,
    pub vessel_id: i64,
    pub phase: Phase,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: i64,
    pub duration_minutes: f64,
    pub duration_hours: f64,
    pub trt_cycle: u32,
    pub forced: bool,
}

impl PhaseSegment {
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    /// Natural key used for cross-run deduplication.
    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(
            self.vessel_id,
            self.phase.as_label(),
            self.start_time,
            self.end_time,
        )
    }
}

/// Natural key of a segment: `(vessel, phase, start, end)` with timestamps
/// normalized to timezone-naive UTC so aware and naive representations of
/// the same instant compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub vessel_id: i64,
    pub phase: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl SegmentKey {
    pub fn new(
        vessel_id: i64,
        phase: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            vessel_id,
            phase: phase.to_string(),
            start_time: start_time.naive_utc(),
            end_time: end_time.naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn key_ignores_timezone_representation() {
        let utc = Utc.with_ymd_and_hms(2025, 4, 26, 7, 0, 0).unwrap();
        let jakarta = FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 4, 26, 14, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        let a = SegmentKey::new(1, "Berthing", utc, utc + Duration::hours(4));
        let b = SegmentKey::new(1, "Berthing", jakarta, jakarta + Duration::hours(4));
        assert_eq!(a, b);
    }
}
