pub mod observation;
pub mod segment;

pub use observation::Observation;
pub use segment::{PhaseSegment, SegmentKey};
