use anyhow::Result;

/// External status classifier: maps a position/speed sample to a raw status
/// label ("Postponed", "Berthing", ...) using geofenced zones and speed
/// thresholds. The zone geometry lives outside this crate; the engine only
/// depends on the label contract.
///
/// Implementations must be deterministic for a given input and side-effect
/// free from the engine's point of view.
pub trait StatusClassifier {
    fn classify(
        &self,
        lat: f64,
        lon: f64,
        speed: f64,
        previous_status: Option<&str>,
    ) -> Result<String>;
}

impl<F> StatusClassifier for F
where
    F: Fn(f64, f64, f64, Option<&str>) -> Result<String>,
{
    fn classify(
        &self,
        lat: f64,
        lon: f64,
        speed: f64,
        previous_status: Option<&str>,
    ) -> Result<String> {
        self(lat, lon, speed, previous_status)
    }
}
