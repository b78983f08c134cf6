use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical operational phase of a vessel inside the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseCategory {
    Waiting,
    Approaching,
    Berthing,
    Departure,
}

impl PhaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseCategory::Waiting => "Waiting",
            PhaseCategory::Approaching => "Approaching",
            PhaseCategory::Berthing => "Berthing",
            PhaseCategory::Departure => "Departure",
        }
    }
}

/// A phase label as it appears on a segment.
///
/// Classifier outputs we recognize normalize into a `Known` category;
/// anything else flows through as `Raw` so an unexpected classifier label
/// never gets silently rewritten or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Known(PhaseCategory),
    Raw(String),
}

impl Phase {
    /// Normalize a raw classifier status into its phase.
    ///
    /// Anchorage statuses fold into Waiting, fairway statuses into
    /// Approaching, and the outbound statuses emitted once a vessel leaves
    /// its berth (Unberthing, Departing, Exit) fold into Departure.
    pub fn normalize(status: &str) -> Phase {
        match status {
            "Postponed" | "Anchoring" => Phase::Known(PhaseCategory::Waiting),
            "Maneuvering" => Phase::Known(PhaseCategory::Approaching),
            "Unberthing" | "Departing" | "Exit" => Phase::Known(PhaseCategory::Departure),
            other => Phase::from_label(other),
        }
    }

    /// Parse a stored phase label. Canonical labels round-trip into `Known`,
    /// everything else stays `Raw`.
    pub fn from_label(label: &str) -> Phase {
        match label {
            "Waiting" => Phase::Known(PhaseCategory::Waiting),
            "Approaching" => Phase::Known(PhaseCategory::Approaching),
            "Berthing" => Phase::Known(PhaseCategory::Berthing),
            "Departure" => Phase::Known(PhaseCategory::Departure),
            other => Phase::Raw(other.to_string()),
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            Phase::Known(category) => category.as_str(),
            Phase::Raw(label) => label.as_str(),
        }
    }

    pub fn category(&self) -> Option<PhaseCategory> {
        match self {
            Phase::Known(category) => Some(*category),
            Phase::Raw(_) => None,
        }
    }

    /// True when a raw classifier status belongs to the Departure family.
    pub fn is_departure_status(status: &str) -> bool {
        matches!(
            Phase::normalize(status),
            Phase::Known(PhaseCategory::Departure)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_label())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Phase::from_label(&label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchorage_statuses_normalize_to_waiting() {
        assert_eq!(
            Phase::normalize("Postponed"),
            Phase::Known(PhaseCategory::Waiting)
        );
        assert_eq!(
            Phase::normalize("Anchoring"),
            Phase::Known(PhaseCategory::Waiting)
        );
    }

    #[test]
    fn fairway_statuses_normalize_to_approaching() {
        assert_eq!(
            Phase::normalize("Approaching"),
            Phase::Known(PhaseCategory::Approaching)
        );
        assert_eq!(
            Phase::normalize("Maneuvering"),
            Phase::Known(PhaseCategory::Approaching)
        );
    }

    #[test]
    fn outbound_statuses_are_departure_family() {
        for status in ["Departure", "Unberthing", "Departing", "Exit"] {
            assert!(Phase::is_departure_status(status), "{status}");
        }
        assert!(!Phase::is_departure_status("Berthing"));
    }

    #[test]
    fn unknown_status_passes_through_raw() {
        let phase = Phase::normalize("Outside_Port");
        assert_eq!(phase, Phase::Raw("Outside_Port".to_string()));
        assert_eq!(phase.as_label(), "Outside_Port");
        assert_eq!(phase.category(), None);
    }

    #[test]
    fn canonical_labels_round_trip() {
        for label in ["Waiting", "Approaching", "Berthing", "Departure"] {
            assert_eq!(Phase::from_label(label).as_label(), label);
        }
    }
}
