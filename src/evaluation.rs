use serde::Serialize;

use crate::db::DayTotals;

/// Port performance standards, in hours, against which per-day totals are
/// judged. Defaults are the Tanjung Priok reference values.
#[derive(Debug, Clone)]
pub struct PortStandards {
    pub waiting_hours: f64,
    pub approaching_hours: f64,
    pub berthing_hours: f64,
    pub trt_hours: f64,
}

impl Default for PortStandards {
    fn default() -> Self {
        Self {
            waiting_hours: 1.0,
            approaching_hours: 2.0,
            berthing_hours: 18.78,
            trt_hours: 21.90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StandardVerdict {
    TooLong,
    AboveStandard,
    RightOnTime,
}

impl StandardVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardVerdict::TooLong => "Too Long",
            StandardVerdict::AboveStandard => "Above Standard",
            StandardVerdict::RightOnTime => "Right on Time",
        }
    }
}

/// Judge one phase duration against the fleet average and the standard.
/// Both comparisons must agree before a verdict leaves "Right on Time".
fn verdict(value: f64, fleet_avg: f64, standard: f64) -> StandardVerdict {
    if value > standard && value > fleet_avg {
        StandardVerdict::TooLong
    } else if value < standard && value < fleet_avg {
        StandardVerdict::AboveStandard
    } else {
        StandardVerdict::RightOnTime
    }
}

/// Fleet-wide mean of each phase total, the second yardstick next to the
/// fixed standards.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetAverages {
    pub waiting_hours: f64,
    pub approaching_hours: f64,
    pub berthing_hours: f64,
    pub trt_hours: f64,
}

pub fn fleet_averages(days: &[DayTotals]) -> FleetAverages {
    if days.is_empty() {
        return FleetAverages::default();
    }
    let n = days.len() as f64;
    FleetAverages {
        waiting_hours: days.iter().map(|d| d.waiting_hours).sum::<f64>() / n,
        approaching_hours: days.iter().map(|d| d.approaching_hours).sum::<f64>() / n,
        berthing_hours: days.iter().map(|d| d.berthing_hours).sum::<f64>() / n,
        trt_hours: days.iter().map(|d| d.trt_hours).sum::<f64>() / n,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEvaluation {
    #[serde(flatten)]
    pub totals: DayTotals,
    pub waiting: StandardVerdict,
    pub approaching: StandardVerdict,
    pub berthing: StandardVerdict,
    pub trt: StandardVerdict,
    pub recommendation: String,
}

pub fn evaluate_day(
    totals: &DayTotals,
    averages: &FleetAverages,
    standards: &PortStandards,
) -> DayEvaluation {
    let waiting = verdict(
        totals.waiting_hours,
        averages.waiting_hours,
        standards.waiting_hours,
    );
    let approaching = verdict(
        totals.approaching_hours,
        averages.approaching_hours,
        standards.approaching_hours,
    );
    let berthing = verdict(
        totals.berthing_hours,
        averages.berthing_hours,
        standards.berthing_hours,
    );
    let trt = verdict(totals.trt_hours, averages.trt_hours, standards.trt_hours);

    let core = [waiting, approaching, berthing];
    let recommendation = if core.contains(&StandardVerdict::TooLong) {
        "Consider optimizing waiting, approaching, or berthing procedures."
    } else if core.iter().all(|v| *v == StandardVerdict::RightOnTime) {
        "Operation meets the standard across all phases."
    } else {
        "Operation runs ahead of the standards."
    };

    DayEvaluation {
        totals: totals.clone(),
        waiting,
        approaching,
        berthing,
        trt,
        recommendation: recommendation.to_string(),
    }
}

/// Evaluate every vessel-day against the fleet average and the standards.
pub fn evaluate_fleet(days: &[DayTotals], standards: &PortStandards) -> Vec<DayEvaluation> {
    let averages = fleet_averages(days);
    days.iter()
        .map(|totals| evaluate_day(totals, &averages, standards))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn totals(waiting: f64, approaching: f64, berthing: f64) -> DayTotals {
        DayTotals {
            vessel_id: 413338660,
            day: NaiveDate::from_ymd_opt(2025, 4, 26).unwrap(),
            waiting_hours: waiting,
            approaching_hours: approaching,
            berthing_hours: berthing,
            trt_hours: waiting + approaching + berthing,
        }
    }

    #[test]
    fn over_standard_and_over_average_is_too_long() {
        assert_eq!(verdict(5.0, 2.0, 1.0), StandardVerdict::TooLong);
    }

    #[test]
    fn under_both_yardsticks_is_above_standard() {
        assert_eq!(verdict(0.5, 1.5, 1.0), StandardVerdict::AboveStandard);
    }

    #[test]
    fn disagreeing_yardsticks_stay_right_on_time() {
        // Under the standard but over the fleet average.
        assert_eq!(verdict(0.9, 0.5, 1.0), StandardVerdict::RightOnTime);
    }

    #[test]
    fn slow_vessel_day_gets_optimization_recommendation() {
        let days = vec![totals(0.5, 1.0, 10.0), totals(6.0, 1.0, 10.0)];
        let evaluations = evaluate_fleet(&days, &PortStandards::default());
        assert_eq!(evaluations[1].waiting, StandardVerdict::TooLong);
        assert!(evaluations[1].recommendation.contains("Consider optimizing"));
    }

    #[test]
    fn fast_vessel_day_runs_ahead_of_standards() {
        let days = vec![totals(0.2, 0.5, 5.0), totals(0.8, 1.8, 18.0)];
        let evaluations = evaluate_fleet(&days, &PortStandards::default());
        assert_eq!(evaluations[0].berthing, StandardVerdict::AboveStandard);
        assert!(evaluations[0].recommendation.contains("ahead of the standards"));
    }

    #[test]
    fn empty_fleet_averages_are_zero() {
        let averages = fleet_averages(&[]);
        assert_eq!(averages.trt_hours, 0.0);
    }
}
