/// Configuration for the segmentation engine with tunable thresholds.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Idle gap between segments that splits a vessel's history into a new
    /// TRT cycle (separate port visits).
    pub max_trt_gap_secs: i64,

    /// Cap on a single phase's duration; also the stuck-status threshold:
    /// a vessel reporting the same status for longer than this aborts the
    /// rest of its scan.
    pub max_phase_hours: f64,

    /// When a stuck-status abort fires, keep the segments already closed
    /// earlier in the same pass and discard only the unclosed tail. Set to
    /// false to discard everything the aborted scan produced.
    pub keep_segments_before_abort: bool,
}

impl SegmentationConfig {
    pub fn max_phase_secs(&self) -> i64 {
        (self.max_phase_hours * 3600.0) as i64
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_trt_gap_secs: 259_200, // 72h
            max_phase_hours: 72.0,
            keep_segments_before_abort: true,
        }
    }
}
