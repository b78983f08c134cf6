//! Turn-round-time phase segmentation for vessel traffic inside a port.
//!
//! The crate walks each vessel's time-ordered AIS observations, classifies
//! them through an external [`StatusClassifier`], and folds the resulting
//! status stream into closed [`PhaseSegment`]s (Waiting, Approaching,
//! Berthing, Departure) grouped into discrete TRT cycles. Segments persist
//! idempotently in a SQLite-backed store keyed by their natural key, and
//! each vessel-cycle gets a completeness label derived fresh from storage.
//! Daily rollups and a port-standards evaluation sit on top.
//!
//! Ingestion, zone geometry, and presentation live outside this crate.

pub mod classifier;
pub mod completeness;
pub mod db;
pub mod evaluation;
pub mod phases;
pub mod runner;
pub mod segmentation;

pub use classifier::StatusClassifier;
pub use completeness::{CompletenessLabel, CycleRollup};
pub use db::models::{Observation, PhaseSegment, SegmentKey};
pub use db::{Database, DayTotals};
pub use phases::{Phase, PhaseCategory};
pub use runner::{FleetReport, TrtPipeline, VesselObservations, VesselReport};
pub use segmentation::{
    EngineError, RuleEvent, ScanOutcome, SegmentationConfig, SegmentationEngine,
};
