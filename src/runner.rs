use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use crate::classifier::StatusClassifier;
use crate::completeness::{self, CompletenessLabel};
use crate::db::models::Observation;
use crate::db::Database;
use crate::segmentation::{RuleEvent, SegmentationConfig, SegmentationEngine};

/// One vessel's ordered observation batch, as supplied by the ingestion
/// collaborator. Sort order `(vessel, timestamp)` is the caller's contract.
#[derive(Debug, Clone)]
pub struct VesselObservations {
    pub vessel_id: i64,
    pub observations: Vec<Observation>,
}

/// What one vessel's pass produced.
#[derive(Debug)]
pub struct VesselReport {
    pub vessel_id: i64,
    pub appended: usize,
    pub aborted: bool,
    /// Completeness per TRT cycle, recomputed from the store after the
    /// append. Empty for aborted vessels.
    pub completeness: BTreeMap<u32, CompletenessLabel>,
    pub events: Vec<RuleEvent>,
}

#[derive(Debug)]
pub struct VesselFailure {
    pub vessel_id: i64,
    pub error: String,
}

#[derive(Debug)]
pub struct FleetReport {
    pub vessels: Vec<VesselReport>,
    pub failures: Vec<VesselFailure>,
}

/// Batch driver: runs the segmentation engine per vessel, appends the
/// surviving segments, and refreshes completeness labels from the store.
///
/// Vessels share nothing but the store handle, so each one runs on its own
/// tokio task. Partial progress is always valid: dedup makes any retry of
/// the whole job idempotent.
#[derive(Clone)]
pub struct TrtPipeline {
    db: Database,
    config: SegmentationConfig,
}

impl TrtPipeline {
    pub fn new(db: Database, config: SegmentationConfig) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Process one vessel end to end: load its persisted keys, scan, append
    /// whatever is new, then relabel its cycles from stored data.
    pub async fn process_vessel<C>(
        &self,
        classifier: &C,
        vessel_id: i64,
        observations: &[Observation],
    ) -> Result<VesselReport>
    where
        C: StatusClassifier + ?Sized,
    {
        let existing = self
            .db
            .load_existing_keys(Some(vessel_id))
            .await
            .with_context(|| format!("failed to load existing keys for vessel {vessel_id}"))?;

        let engine = SegmentationEngine::new(classifier, &self.config);
        let outcome = engine.run(vessel_id, observations, &existing)?;

        let appended = self
            .db
            .append_segments(&outcome.segments)
            .await
            .with_context(|| format!("failed to append segments for vessel {vessel_id}"))?;

        let mut labels = BTreeMap::new();
        if !outcome.aborted {
            for cycle in self.db.list_cycles(vessel_id).await? {
                let segments = self.db.load_segments(vessel_id, cycle).await?;
                let rollup = completeness::rollup_segments(&segments);
                labels.insert(cycle, completeness::classify(&rollup));
            }
        }

        info!(
            "vessel {vessel_id}: appended {appended} segments across {} cycles{}",
            labels.len(),
            if outcome.aborted { " (scan aborted)" } else { "" }
        );

        Ok(VesselReport {
            vessel_id,
            appended,
            aborted: outcome.aborted,
            completeness: labels,
            events: outcome.events,
        })
    }

    /// Fan out across the fleet, one worker per vessel. A failing vessel is
    /// reported, not fatal; its data is untouched and a rerun picks it up.
    pub async fn process_fleet<C>(
        &self,
        classifier: Arc<C>,
        fleet: Vec<VesselObservations>,
    ) -> FleetReport
    where
        C: StatusClassifier + Send + Sync + 'static,
    {
        let mut handles = Vec::with_capacity(fleet.len());
        for vessel in fleet {
            let pipeline = self.clone();
            let classifier = Arc::clone(&classifier);
            let vessel_id = vessel.vessel_id;
            let handle = tokio::spawn(async move {
                pipeline
                    .process_vessel(classifier.as_ref(), vessel.vessel_id, &vessel.observations)
                    .await
            });
            handles.push((vessel_id, handle));
        }

        let mut vessels = Vec::new();
        let mut failures = Vec::new();
        for (vessel_id, handle) in handles {
            match handle.await {
                Ok(Ok(report)) => vessels.push(report),
                Ok(Err(err)) => {
                    error!("vessel {vessel_id}: processing failed: {err:#}");
                    failures.push(VesselFailure {
                        vessel_id,
                        error: format!("{err:#}"),
                    });
                }
                Err(join_err) => {
                    error!("vessel {vessel_id}: worker panicked: {join_err}");
                    failures.push(VesselFailure {
                        vessel_id,
                        error: join_err.to_string(),
                    });
                }
            }
        }

        FleetReport { vessels, failures }
    }

    /// Current completeness of one vessel-cycle, straight from the store.
    pub async fn completeness_for(
        &self,
        vessel_id: i64,
        cycle: u32,
    ) -> Result<CompletenessLabel> {
        let segments = self.db.load_segments(vessel_id, cycle).await?;
        Ok(completeness::classify(&completeness::rollup_segments(
            &segments,
        )))
    }

    /// Drop a vessel's segments ahead of a full reprocessing run.
    pub async fn reset_vessel(&self, vessel_id: i64) -> Result<usize> {
        let deleted = self.db.delete_vessel_segments(vessel_id).await?;
        info!("vessel {vessel_id}: deleted {deleted} segments for reprocessing");
        Ok(deleted)
    }

    /// Rebuild the daily rollup tables consumed by the evaluation layer.
    pub async fn rebuild_daily_rollups(&self) -> Result<()> {
        self.db.rebuild_daily_rollups().await
    }
}
