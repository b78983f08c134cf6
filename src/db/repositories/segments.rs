use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{PhaseSegment, SegmentKey},
};
use crate::phases::Phase;

fn row_to_segment(row: &Row) -> Result<PhaseSegment> {
    let phase: String = row.get("phase")?;
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;

    Ok(PhaseSegment {
        id: row.get("id")?,
        vessel_id: row.get("vessel_id")?,
        phase: Phase::from_label(&phase),
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_datetime(&end_time, "end_time")?,
        duration_secs: row.get("duration_secs")?,
        duration_minutes: row.get("duration_minutes")?,
        duration_hours: row.get("duration_hours")?,
        trt_cycle: row.get("trt_cycle")?,
        forced: row.get("forced")?,
    })
}

impl Database {
    /// Append a batch of segments in one transaction. The unique index on
    /// the natural key rejects duplicates, and the transaction makes the
    /// batch all-or-nothing; callers retry whole runs, never partial ones.
    pub async fn append_segments(&self, segments: &[PhaseSegment]) -> Result<usize> {
        if segments.is_empty() {
            return Ok(0);
        }
        let segments = segments.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            for segment in &segments {
                tx.execute(
                    "INSERT INTO phase_segments (
                        id,
                        vessel_id,
                        phase,
                        start_time,
                        end_time,
                        duration_secs,
                        duration_minutes,
                        duration_hours,
                        trt_cycle,
                        forced
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        segment.id,
                        segment.vessel_id,
                        segment.phase.as_label(),
                        segment.start_time.to_rfc3339(),
                        segment.end_time.to_rfc3339(),
                        segment.duration_secs,
                        segment.duration_minutes,
                        segment.duration_hours,
                        segment.trt_cycle,
                        segment.forced,
                    ],
                )
                .with_context(|| {
                    format!(
                        "failed to insert {} segment for vessel {}",
                        segment.phase, segment.vessel_id
                    )
                })?;
            }

            tx.commit().context("failed to commit segment batch")?;
            Ok(segments.len())
        })
        .await
    }

    /// Load the natural keys of already persisted segments, optionally
    /// scoped to one vessel. Timestamps come back timezone-naive so aware
    /// and naive representations of the same instant compare equal.
    pub async fn load_existing_keys(
        &self,
        vessel_id: Option<i64>,
    ) -> Result<HashSet<SegmentKey>> {
        self.execute(move |conn| {
            let sql = "SELECT vessel_id, phase, start_time, end_time FROM phase_segments";
            let mut keys = HashSet::new();

            let mut collect = |row: &Row| -> Result<()> {
                let vessel_id: i64 = row.get(0)?;
                let phase: String = row.get(1)?;
                let start_time = parse_datetime(&row.get::<_, String>(2)?, "start_time")?;
                let end_time = parse_datetime(&row.get::<_, String>(3)?, "end_time")?;
                keys.insert(SegmentKey::new(vessel_id, &phase, start_time, end_time));
                Ok(())
            };

            match vessel_id {
                Some(id) => {
                    let mut stmt = conn.prepare(&format!("{sql} WHERE vessel_id = ?1"))?;
                    let mut rows = stmt.query(params![id])?;
                    while let Some(row) = rows.next()? {
                        collect(row)?;
                    }
                }
                None => {
                    let mut stmt = conn.prepare(sql)?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        collect(row)?;
                    }
                }
            }

            Ok(keys)
        })
        .await
    }

    /// TRT cycle numbers present for a vessel, ascending.
    pub async fn list_cycles(&self, vessel_id: i64) -> Result<Vec<u32>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT trt_cycle FROM phase_segments
                 WHERE vessel_id = ?1
                 ORDER BY trt_cycle ASC",
            )?;
            let mut rows = stmt.query(params![vessel_id])?;
            let mut cycles = Vec::new();
            while let Some(row) = rows.next()? {
                cycles.push(row.get(0)?);
            }
            Ok(cycles)
        })
        .await
    }

    /// Segments of one vessel-cycle, ordered by start time.
    pub async fn load_segments(&self, vessel_id: i64, cycle: u32) -> Result<Vec<PhaseSegment>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, vessel_id, phase, start_time, end_time,
                        duration_secs, duration_minutes, duration_hours,
                        trt_cycle, forced
                 FROM phase_segments
                 WHERE vessel_id = ?1 AND trt_cycle = ?2
                 ORDER BY start_time ASC",
            )?;
            let mut rows = stmt.query(params![vessel_id, cycle])?;
            let mut segments = Vec::new();
            while let Some(row) = rows.next()? {
                segments.push(row_to_segment(row)?);
            }
            Ok(segments)
        })
        .await
    }

    /// All segments of one vessel across cycles, ordered by start time.
    pub async fn load_vessel_segments(&self, vessel_id: i64) -> Result<Vec<PhaseSegment>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, vessel_id, phase, start_time, end_time,
                        duration_secs, duration_minutes, duration_hours,
                        trt_cycle, forced
                 FROM phase_segments
                 WHERE vessel_id = ?1
                 ORDER BY start_time ASC",
            )?;
            let mut rows = stmt.query(params![vessel_id])?;
            let mut segments = Vec::new();
            while let Some(row) = rows.next()? {
                segments.push(row_to_segment(row)?);
            }
            Ok(segments)
        })
        .await
    }

    /// Drop a vessel's history ahead of explicit reprocessing. Segments are
    /// never mutated in place; delete-and-rerun is the only rewrite path.
    pub async fn delete_vessel_segments(&self, vessel_id: i64) -> Result<usize> {
        self.execute(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM phase_segments WHERE vessel_id = ?1",
                    params![vessel_id],
                )
                .with_context(|| format!("failed to delete segments for vessel {vessel_id}"))?;
            Ok(deleted)
        })
        .await
    }
}
