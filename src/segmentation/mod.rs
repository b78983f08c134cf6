pub mod config;
pub mod engine;
pub mod events;
pub mod tracker;

pub use config::SegmentationConfig;
pub use engine::{EngineError, ScanOutcome, SegmentationEngine};
pub use events::RuleEvent;
pub use tracker::CycleTracker;
