use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One vessel position/status sample from the AIS feed.
///
/// The engine consumes observations in non-decreasing `received_at` order
/// per vessel; the collaborator supplying the stream upholds that invariant
/// and the engine fails fast when it is broken.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub vessel_id: i64,
    pub received_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
}

impl Observation {
    pub fn new(vessel_id: i64, received_at: DateTime<Utc>, lat: f64, lon: f64, speed: f64) -> Self {
        Self {
            vessel_id,
            received_at,
            lat,
            lon,
            speed,
        }
    }
}
