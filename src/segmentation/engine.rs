use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::StatusClassifier;
use crate::completeness::CycleRollup;
use crate::db::models::{Observation, PhaseSegment, SegmentKey};
use crate::phases::{Phase, PhaseCategory};
use crate::segmentation::config::SegmentationConfig;
use crate::segmentation::events::RuleEvent;
use crate::segmentation::tracker::CycleTracker;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("observations for vessel {vessel_id} are out of order: {at} arrived after {prev}")]
    OutOfOrder {
        vessel_id: i64,
        prev: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    #[error("status classifier failed for vessel {vessel_id} at {at}")]
    Classifier {
        vessel_id: i64,
        at: DateTime<Utc>,
        #[source]
        source: anyhow::Error,
    },
}

/// Everything one vessel scan produced: the candidate segments that survived
/// dedup, per-cycle rollups for completeness classification, and the sanity
/// rules that fired along the way.
#[derive(Debug)]
pub struct ScanOutcome {
    pub segments: Vec<PhaseSegment>,
    pub cycles: BTreeMap<u32, CycleRollup>,
    pub aborted: bool,
    pub events: Vec<RuleEvent>,
}

/// Walks one vessel's ordered observations and emits closed phase segments.
///
/// The scan is a single linear pass. Each observation is classified, then
/// run through the sanity rules (stuck-status abort, idle-gap cycle split)
/// before the transition logic closes segments. A Berthing dwell that ends
/// in a non-Berthing status is relabeled Departure: the vessel left its
/// berth, so the dwell reads as the departure leg of the turn-round.
pub struct SegmentationEngine<'a, C: StatusClassifier + ?Sized> {
    classifier: &'a C,
    config: &'a SegmentationConfig,
}

impl<'a, C: StatusClassifier + ?Sized> SegmentationEngine<'a, C> {
    pub fn new(classifier: &'a C, config: &'a SegmentationConfig) -> Self {
        Self { classifier, config }
    }

    /// Scan `observations` (ascending by timestamp) for `vessel_id`.
    /// `existing` holds the natural keys already persisted; candidates that
    /// match one are skipped so re-runs are idempotent.
    pub fn run(
        &self,
        vessel_id: i64,
        observations: &[Observation],
        existing: &HashSet<SegmentKey>,
    ) -> Result<ScanOutcome, EngineError> {
        let mut tracker = CycleTracker::new();
        let mut segments = Vec::new();
        let mut events = Vec::new();
        let mut prev_ts: Option<DateTime<Utc>> = None;

        for obs in observations {
            if let Some(prev) = prev_ts {
                if obs.received_at < prev {
                    return Err(EngineError::OutOfOrder {
                        vessel_id,
                        prev,
                        at: obs.received_at,
                    });
                }
            }
            prev_ts = Some(obs.received_at);

            let status = self
                .classifier
                .classify(
                    obs.lat,
                    obs.lon,
                    obs.speed,
                    tracker.current_status.as_deref(),
                )
                .map_err(|source| EngineError::Classifier {
                    vessel_id,
                    at: obs.received_at,
                    source,
                })?;

            // Stuck status: the same label held past the phase cap means the
            // feed is frozen or the vessel is parked outside normal
            // operations; the rest of this vessel's scan is abandoned.
            if let (Some(current), Some(start)) =
                (tracker.current_status.as_deref(), tracker.segment_start)
            {
                if current == status {
                    let elapsed = (obs.received_at - start).num_seconds();
                    if elapsed > self.config.max_phase_secs() {
                        warn!(
                            "vessel {vessel_id}: status '{status}' stuck for {elapsed}s, aborting scan"
                        );
                        events.push(RuleEvent::StuckStatusAbort {
                            vessel_id,
                            status,
                            elapsed_secs: elapsed,
                            at: obs.received_at,
                        });
                        tracker.skip_vessel = true;
                        break;
                    }
                }
            }

            // Idle gap: a long silence since the last close means a separate
            // port visit, so subsequent segments open under a new TRT cycle.
            if let Some(last_end) = tracker.last_segment_end {
                let gap = (obs.received_at - last_end).num_seconds();
                if gap > self.config.max_trt_gap_secs {
                    let cycle = tracker.split_cycle();
                    info!("vessel {vessel_id}: {gap}s idle gap, starting TRT cycle {cycle}");
                    events.push(RuleEvent::CycleSplit {
                        vessel_id,
                        gap_secs: gap,
                        cycle,
                        at: obs.received_at,
                    });
                }
            }

            let Some(current) = tracker.current_status.clone() else {
                tracker.open_segment(status, obs.received_at);
                continue;
            };

            if status != current {
                self.close_segment(
                    vessel_id,
                    &mut tracker,
                    &current,
                    obs.received_at,
                    true,
                    existing,
                    &mut segments,
                    &mut events,
                );
                tracker.open_segment(status, obs.received_at);
                tracker.last_segment_end = Some(obs.received_at);
            }
        }

        if tracker.skip_vessel {
            if !self.config.keep_segments_before_abort {
                segments.clear();
            }
            // No tail close and no completeness input: the aborted vessel's
            // cycles stay unlabeled until a later reprocessing run.
            return Ok(ScanOutcome {
                segments,
                cycles: BTreeMap::new(),
                aborted: true,
                events,
            });
        }

        // Tail segment: close the open phase at the last observation.
        if let (Some(current), Some(last)) = (tracker.current_status.clone(), observations.last()) {
            self.close_segment(
                vessel_id,
                &mut tracker,
                &current,
                last.received_at,
                false,
                existing,
                &mut segments,
                &mut events,
            );
        }

        Ok(ScanOutcome {
            segments,
            cycles: tracker.into_cycles(),
            aborted: false,
            events,
        })
    }

    /// Close the open segment at `end_time`. Zero-length spans are dropped
    /// silently, over-cap durations are clamped, and candidates whose
    /// natural key is already persisted are skipped without touching the
    /// cycle rollup.
    #[allow(clippy::too_many_arguments)]
    fn close_segment(
        &self,
        vessel_id: i64,
        tracker: &mut CycleTracker,
        raw_status: &str,
        end_time: DateTime<Utc>,
        transition: bool,
        existing: &HashSet<SegmentKey>,
        segments: &mut Vec<PhaseSegment>,
        events: &mut Vec<RuleEvent>,
    ) {
        let Some(start_time) = tracker.segment_start else {
            return;
        };

        let mut duration_secs = (end_time - start_time).num_seconds();
        if duration_secs <= 0 {
            return;
        }
        let mut duration_minutes = round2(duration_secs as f64 / 60.0);
        let mut duration_hours = round2(duration_secs as f64 / 3600.0);

        // A transition out of Berthing is the vessel leaving its berth, so
        // the dwell is relabeled Departure; the tail close keeps its own
        // label since no transition was observed.
        let (phase, forced) = if transition && raw_status == "Berthing" {
            (Phase::Known(PhaseCategory::Departure), true)
        } else {
            (Phase::normalize(raw_status), false)
        };

        if duration_hours > self.config.max_phase_hours {
            info!(
                "vessel {vessel_id}: capping {phase} segment from {duration_hours}h to {}h",
                self.config.max_phase_hours
            );
            events.push(RuleEvent::DurationCapped {
                vessel_id,
                phase: phase.clone(),
                raw_hours: duration_hours,
                at: end_time,
            });
            duration_secs = self.config.max_phase_secs();
            duration_minutes = self.config.max_phase_hours * 60.0;
            duration_hours = self.config.max_phase_hours;
        }

        let key = SegmentKey::new(vessel_id, phase.as_label(), start_time, end_time);
        if existing.contains(&key) {
            debug!(
                "vessel {vessel_id}: {phase} segment [{start_time}, {end_time}) already persisted"
            );
            events.push(RuleEvent::DuplicateSkipped {
                vessel_id,
                phase,
                start_time,
                end_time,
            });
            return;
        }

        tracker.note_emitted(&phase, forced, duration_hours);
        segments.push(PhaseSegment {
            id: Uuid::new_v4().to_string(),
            vessel_id,
            phase,
            start_time,
            end_time,
            duration_secs,
            duration_minutes,
            duration_hours,
            trt_cycle: tracker.cycle,
            forced,
        });
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use chrono::{Duration, TimeZone};

    use crate::completeness::{self, CompletenessLabel};
    use crate::phases::PhaseCategory;

    // Speed-band stand-in for the geofenced classifier: deterministic and
    // free of zone geometry, which is all the engine contract requires.
    fn by_speed(_lat: f64, _lon: f64, speed: f64, _prev: Option<&str>) -> Result<String> {
        if speed < 0.0 {
            bail!("negative speed {speed}");
        }
        let label = if speed <= 0.2 {
            "Berthing"
        } else if speed <= 3.0 {
            "Maneuvering"
        } else if speed <= 7.0 {
            "Approaching"
        } else if speed <= 9.0 {
            "Anchoring"
        } else if speed <= 12.0 {
            "Postponed"
        } else if speed <= 15.0 {
            "Departing"
        } else {
            "Outside_Port"
        };
        Ok(label.to_string())
    }

    fn obs(vessel_id: i64, offset_secs: i64, speed: f64) -> Observation {
        let base = Utc.with_ymd_and_hms(2025, 4, 26, 7, 0, 0).unwrap();
        Observation::new(
            vessel_id,
            base + Duration::seconds(offset_secs),
            -6.09,
            106.88,
            speed,
        )
    }

    fn run(
        observations: &[Observation],
        existing: &HashSet<SegmentKey>,
        config: &SegmentationConfig,
    ) -> ScanOutcome {
        let classifier = by_speed;
        SegmentationEngine::new(&classifier, config)
            .run(1, observations, existing)
            .unwrap()
    }

    fn run_default(observations: &[Observation]) -> ScanOutcome {
        run(
            observations,
            &HashSet::new(),
            &SegmentationConfig::default(),
        )
    }

    #[test]
    fn empty_stream_is_a_noop() {
        let outcome = run_default(&[]);
        assert!(outcome.segments.is_empty());
        assert!(outcome.cycles.is_empty());
        assert!(!outcome.aborted);
    }

    #[test]
    fn single_observation_emits_nothing() {
        let outcome = run_default(&[obs(1, 0, 9.0)]);
        assert!(outcome.segments.is_empty());
    }

    #[test]
    fn constant_status_emits_one_tail_segment() {
        let outcome = run_default(&[obs(1, 0, 9.0), obs(1, 3600, 9.0), obs(1, 7200, 9.0)]);
        assert_eq!(outcome.segments.len(), 1);
        let segment = &outcome.segments[0];
        assert_eq!(segment.phase, Phase::Known(PhaseCategory::Waiting));
        assert_eq!(segment.duration_secs, 7200);
        assert!((segment.duration_hours - 2.0).abs() < f64::EPSILON);
        assert_eq!(segment.trt_cycle, 1);
    }

    #[test]
    fn berth_exit_relabels_the_dwell_as_departure() {
        // Anchoring → Approaching → Berthing → Approaching, one hour each.
        let outcome = run_default(&[
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),
            obs(1, 7200, 0.0),
            obs(1, 10800, 5.0),
        ]);

        let phases: Vec<_> = outcome.segments.iter().map(|s| s.phase.clone()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Known(PhaseCategory::Waiting),
                Phase::Known(PhaseCategory::Approaching),
                Phase::Known(PhaseCategory::Departure),
            ]
        );
        for segment in &outcome.segments {
            assert_eq!(segment.duration_secs, 3600);
            assert!((segment.duration_hours - 1.0).abs() < f64::EPSILON);
            assert_eq!(segment.trt_cycle, 1);
            assert!(segment.end_time > segment.start_time);
        }
        // The Departure label was forced off a Berthing dwell.
        assert!(outcome.segments[2].forced);

        // No genuine departure observation, so the cycle is PHASED.
        let label = completeness::classify(&outcome.cycles[&1]);
        assert_eq!(label, CompletenessLabel::Phased);
    }

    #[test]
    fn berthing_tail_keeps_its_own_label() {
        let outcome = run_default(&[obs(1, 0, 9.0), obs(1, 3600, 0.0), obs(1, 7200, 0.0)]);
        assert_eq!(outcome.segments.len(), 2);
        assert_eq!(
            outcome.segments[1].phase,
            Phase::Known(PhaseCategory::Berthing)
        );
        assert!(!outcome.segments[1].forced);
    }

    #[test]
    fn genuine_departure_status_completes_the_cycle() {
        let outcome = run_default(&[
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),
            obs(1, 7200, 0.0),
            obs(1, 10800, 13.0), // Departing
            obs(1, 14400, 20.0), // Outside_Port closes the Departing span
        ]);
        assert_eq!(outcome.segments.len(), 4);
        assert!(outcome.segments[2].forced);
        assert!(!outcome.segments[3].forced);
        assert_eq!(
            completeness::classify(&outcome.cycles[&1]),
            CompletenessLabel::Completed
        );
    }

    #[test]
    fn zero_duration_segments_are_dropped() {
        let outcome = run_default(&[obs(1, 0, 9.0), obs(1, 0, 5.0)]);
        assert!(outcome.segments.is_empty());
    }

    #[test]
    fn stuck_status_aborts_but_keeps_closed_segments() {
        let observations = [
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),
            obs(1, 3600 + 73 * 3600, 5.0), // same status 73h later
        ];
        let outcome = run_default(&observations);
        assert!(outcome.aborted);
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(
            outcome.segments[0].phase,
            Phase::Known(PhaseCategory::Waiting)
        );
        assert!(outcome.cycles.is_empty());
        assert!(matches!(
            outcome.events.as_slice(),
            [RuleEvent::StuckStatusAbort { .. }]
        ));
    }

    #[test]
    fn stuck_abort_can_discard_the_whole_pass() {
        let config = SegmentationConfig {
            keep_segments_before_abort: false,
            ..SegmentationConfig::default()
        };
        let observations = [
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),
            obs(1, 3600 + 73 * 3600, 5.0),
        ];
        let outcome = run(&observations, &HashSet::new(), &config);
        assert!(outcome.aborted);
        assert!(outcome.segments.is_empty());
    }

    #[test]
    fn idle_gap_splits_into_a_new_cycle() {
        let outcome = run_default(&[
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),            // closes Waiting, cycle 1
            obs(1, 3600 + 80 * 3600, 0.0), // 80h later: new visit
            obs(1, 7200 + 80 * 3600, 5.0), // closes Berthing as forced Departure
        ]);
        assert_eq!(outcome.segments.len(), 2);
        assert_eq!(outcome.segments[0].trt_cycle, 1);
        assert_eq!(outcome.segments[1].trt_cycle, 2);
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, RuleEvent::CycleSplit { cycle: 2, .. })));
        assert_eq!(outcome.cycles.len(), 2);
    }

    #[test]
    fn over_cap_duration_is_clamped() {
        // 80h in one status with no same-status observation in between, so
        // the stuck rule cannot fire before the transition closes it.
        let outcome = run_default(&[obs(1, 0, 9.0), obs(1, 80 * 3600, 5.0)]);
        assert_eq!(outcome.segments.len(), 1);
        let segment = &outcome.segments[0];
        assert_eq!(segment.duration_secs, 259_200);
        assert!((segment.duration_hours - 72.0).abs() < f64::EPSILON);
        assert!((segment.duration_minutes - 4320.0).abs() < f64::EPSILON);
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, RuleEvent::DurationCapped { .. })));
    }

    #[test]
    fn out_of_order_observations_fail_fast() {
        let classifier = by_speed;
        let config = SegmentationConfig::default();
        let engine = SegmentationEngine::new(&classifier, &config);
        let result = engine.run(1, &[obs(1, 3600, 9.0), obs(1, 0, 5.0)], &HashSet::new());
        assert!(matches!(result, Err(EngineError::OutOfOrder { .. })));
    }

    #[test]
    fn classifier_failure_aborts_the_vessel() {
        let classifier = by_speed;
        let config = SegmentationConfig::default();
        let engine = SegmentationEngine::new(&classifier, &config);
        let result = engine.run(1, &[obs(1, 0, 9.0), obs(1, 3600, -1.0)], &HashSet::new());
        assert!(matches!(result, Err(EngineError::Classifier { .. })));
    }

    #[test]
    fn rerun_with_persisted_keys_emits_nothing() {
        let observations = [
            obs(1, 0, 9.0),
            obs(1, 3600, 5.0),
            obs(1, 7200, 0.0),
            obs(1, 10800, 5.0),
        ];
        let first = run_default(&observations);
        assert_eq!(first.segments.len(), 3);

        let persisted: HashSet<SegmentKey> = first.segments.iter().map(|s| s.key()).collect();
        let second = run(&observations, &persisted, &SegmentationConfig::default());
        assert!(second.segments.is_empty());
        assert_eq!(
            second
                .events
                .iter()
                .filter(|e| matches!(e, RuleEvent::DuplicateSkipped { .. }))
                .count(),
            3
        );
    }
}
