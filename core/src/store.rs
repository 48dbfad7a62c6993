//! SQLite results archive.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never reads from here; a run is archived after it ends.

use crate::{
    error::{SimError, SimResult},
    event::TraceEntry,
    stats::KpiRecord,
    types::RunId,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// A fresh, globally unique run id.
pub fn new_run_id() -> RunId {
    Uuid::new_v4().to_string()
}

/// One row of the `run` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub run_id:     RunId,
    pub scenario:   String,
    pub seed:       u64,
    pub version:    String,
    pub created_at: String,
}

pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Open (or create) the results database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_results.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, scenario: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, scenario, seed, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, scenario, seed as i64, version, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_run(&self, run_id: &str) -> SimResult<RunRow> {
        self.conn
            .query_row(
                "SELECT run_id, scenario, seed, version, created_at FROM run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRow {
                        run_id:     row.get(0)?,
                        scenario:   row.get(1)?,
                        seed:       row.get::<_, i64>(2)? as u64,
                        version:    row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| SimError::RunNotFound { run_id: run_id.to_string() })
    }

    pub fn run_ids(&self) -> SimResult<Vec<RunId>> {
        let mut stmt = self.conn.prepare("SELECT run_id FROM run ORDER BY created_at, run_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    // ── KPI record ─────────────────────────────────────────────

    /// Store the full record as JSON next to a few queryable columns.
    pub fn save_kpis(&self, run_id: &str, kpis: &KpiRecord) -> SimResult<()> {
        let payload = serde_json::to_string(kpis)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kpi_record
             (run_id, arrived, served, abandoned, in_flight, mean_wait, mismatch_pct, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                kpis.arrived as i64,
                kpis.served as i64,
                kpis.abandoned as i64,
                kpis.in_flight as i64,
                kpis.total_wait.mean,
                kpis.matches.mismatch_pct,
                payload,
            ],
        )?;
        Ok(())
    }

    pub fn load_kpis(&self, run_id: &str) -> SimResult<KpiRecord> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM kpi_record WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| SimError::RunNotFound { run_id: run_id.to_string() })?;
        Ok(serde_json::from_str(&payload)?)
    }

    // ── Trace ──────────────────────────────────────────────────

    /// Append trace entries in order, in one transaction.
    pub fn append_trace(&mut self, run_id: &str, entries: &[TraceEntry]) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO event_log (run_id, sim_time, event_type, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in entries {
                let payload = serde_json::to_string(&entry.event)?;
                stmt.execute(params![run_id, entry.time, entry.event.type_name(), payload])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn trace_count(&self, run_id: &str) -> SimResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Read a run's trace back in insertion order.
    pub fn load_trace(&self, run_id: &str) -> SimResult<Vec<TraceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT sim_time, payload FROM event_log WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(time, payload)| -> SimResult<TraceEntry> {
                Ok(TraceEntry { time, event: serde_json::from_str(&payload)? })
            })
            .collect()
    }
}
