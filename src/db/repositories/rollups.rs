use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::connection::Database;

/// Per-vessel per-day phase totals, read back from the rollup tables for
/// the standards evaluation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
    pub vessel_id: i64,
    pub day: NaiveDate,
    pub waiting_hours: f64,
    pub approaching_hours: f64,
    pub berthing_hours: f64,
    pub trt_hours: f64,
}

const PHASE_ROLLUPS: &[(&str, &str)] = &[
    ("daily_waiting_time", "phase = 'Waiting'"),
    ("daily_approaching_time", "phase = 'Approaching'"),
    ("daily_berthing_time", "phase = 'Berthing'"),
    (
        "daily_turn_round_time",
        "phase IN ('Waiting', 'Approaching', 'Berthing', 'Departure')",
    ),
];

impl Database {
    /// Rebuild all daily rollup tables from phase_segments. Rollups are
    /// derived data, so a full delete-and-reinsert inside one transaction
    /// is the rewrite path; the segment table itself is never touched.
    pub async fn rebuild_daily_rollups(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;

            for (table, filter) in PHASE_ROLLUPS {
                tx.execute(&format!("DELETE FROM {table}"), [])?;
                tx.execute(
                    &format!(
                        "INSERT INTO {table} (vessel_id, day, total_hours, total_minutes, total_seconds)
                         SELECT
                             vessel_id,
                             DATE(start_time) AS day,
                             ROUND(SUM(duration_hours), 2),
                             ROUND(SUM(duration_hours * 60), 2),
                             CAST(SUM(duration_hours * 3600) AS INTEGER)
                         FROM phase_segments
                         WHERE {filter}
                         GROUP BY vessel_id, day"
                    ),
                    [],
                )
                .with_context(|| format!("failed to rebuild {table}"))?;
            }

            // Generic per-phase table keeps raw passthrough phases too.
            tx.execute("DELETE FROM daily_phase_time", [])?;
            tx.execute(
                "INSERT INTO daily_phase_time (vessel_id, phase, day, total_hours, total_minutes, total_seconds)
                 SELECT
                     vessel_id,
                     phase,
                     DATE(start_time) AS day,
                     ROUND(SUM(duration_hours), 2),
                     ROUND(SUM(duration_hours * 60), 2),
                     CAST(SUM(duration_hours * 3600) AS INTEGER)
                 FROM phase_segments
                 GROUP BY vessel_id, phase, day",
                [],
            )
            .context("failed to rebuild daily_phase_time")?;

            tx.commit().context("failed to commit rollup rebuild")?;
            Ok(())
        })
        .await
    }

    /// Per-vessel per-day totals across the rollup tables, keyed off the
    /// TRT table so a day only shows up once it has canonical-phase time.
    pub async fn load_daily_totals(&self) -> Result<Vec<DayTotals>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                     t.vessel_id,
                     t.day,
                     COALESCE(w.total_hours, 0.0),
                     COALESCE(a.total_hours, 0.0),
                     COALESCE(b.total_hours, 0.0),
                     t.total_hours
                 FROM daily_turn_round_time t
                 LEFT JOIN daily_waiting_time w
                     ON w.vessel_id = t.vessel_id AND w.day = t.day
                 LEFT JOIN daily_approaching_time a
                     ON a.vessel_id = t.vessel_id AND a.day = t.day
                 LEFT JOIN daily_berthing_time b
                     ON b.vessel_id = t.vessel_id AND b.day = t.day
                 ORDER BY t.vessel_id, t.day",
            )?;

            let mut rows = stmt.query([])?;
            let mut totals = Vec::new();
            while let Some(row) = rows.next()? {
                let day: String = row.get(1)?;
                totals.push(DayTotals {
                    vessel_id: row.get(0)?,
                    day: NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                        .with_context(|| format!("invalid rollup day '{day}'"))?,
                    waiting_hours: row.get(2)?,
                    approaching_hours: row.get(3)?,
                    berthing_hours: row.get(4)?,
                    trt_hours: row.get(5)?,
                });
            }
            Ok(totals)
        })
        .await
    }
}
