// Report persistence. Receives only already-validated, already-sanitized
// data from the handlers; never sees raw model output.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;

/// Reports returned by the default listing.
pub const DEFAULT_LIST_LIMIT: u32 = 5;

/// A report row as persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub filename: String,
    pub row_count: i64,
    pub column_count: i64,
    pub columns_analyzed: Vec<String>,
    pub insights_summary: String,
    pub trends: String,
    pub outliers: String,
    pub recommendations: String,
    pub csv_preview_json: Vec<HashMap<String, String>>,
    pub created_at: String,
}

/// Fields of a report about to be created.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub filename: String,
    pub row_count: i64,
    pub column_count: i64,
    pub columns_analyzed: Vec<String>,
    pub insights_summary: String,
    pub trends: String,
    pub outliers: String,
    pub recommendations: String,
    pub csv_preview_json: Vec<HashMap<String, String>>,
}

/// SQLite-backed report store. Cheap to clone; all clones share one
/// mutex-guarded connection.
#[derive(Clone)]
pub struct ReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl ReportStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_database(path)?)),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_memory_database()?)),
        })
    }

    pub fn save(&self, report: &NewReport) -> Result<Report, DatabaseError> {
        let columns_json = serde_json::to_string(&report.columns_analyzed)?;
        let preview_json = serde_json::to_string(&report.csv_preview_json)?;
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO reports (filename, row_count, column_count, columns_analyzed,
                                  insights_summary, trends, outliers, recommendations,
                                  csv_preview_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                report.filename,
                report.row_count,
                report.column_count,
                columns_json,
                report.insights_summary,
                report.trends,
                report.outliers,
                report.recommendations,
                preview_json,
                created_at,
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Report {
            id,
            filename: report.filename.clone(),
            row_count: report.row_count,
            column_count: report.column_count,
            columns_analyzed: report.columns_analyzed.clone(),
            insights_summary: report.insights_summary.clone(),
            trends: report.trends.clone(),
            outliers: report.outliers.clone(),
            recommendations: report.recommendations.clone(),
            csv_preview_json: report.csv_preview_json.clone(),
            created_at,
        })
    }

    /// Most recent reports, newest first.
    pub fn list_recent(&self, limit: u32) -> Result<Vec<Report>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, row_count, column_count, columns_analyzed,
                    insights_summary, trends, outliers, recommendations,
                    csv_preview_json, created_at
             FROM reports
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;

        let reports = stmt
            .query_map(rusqlite::params![limit], row_to_report)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    pub fn get(&self, id: i64) -> Result<Option<Report>, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, row_count, column_count, columns_analyzed,
                    insights_summary, trends, outliers, recommendations,
                    csv_preview_json, created_at
             FROM reports
             WHERE id = ?1",
        )?;

        let mut rows = stmt.query_map(rusqlite::params![id], row_to_report)?;
        match rows.next() {
            Some(report) => Ok(Some(report?)),
            None => Ok(None),
        }
    }

    /// Liveness probe: reported as a bool, never raised.
    pub fn health_check(&self) -> bool {
        let Ok(conn) = self.conn.lock() else {
            return false;
        };
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    let columns_json: String = row.get(4)?;
    let preview_json: String = row.get(9)?;

    Ok(Report {
        id: row.get(0)?,
        filename: row.get(1)?,
        row_count: row.get(2)?,
        column_count: row.get(3)?,
        columns_analyzed: serde_json::from_str(&columns_json).unwrap_or_default(),
        insights_summary: row.get(5)?,
        trends: row.get(6)?,
        outliers: row.get(7)?,
        recommendations: row.get(8)?,
        csv_preview_json: serde_json::from_str(&preview_json).unwrap_or_default(),
        created_at: row.get(10)?,
    })
}
