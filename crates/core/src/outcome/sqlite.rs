use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;

use super::{ApplicationOutcome, OutcomeError, OutcomeFilter, OutcomeStatus, OutcomeStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    group_id TEXT NOT NULL,
    listing_id TEXT NOT NULL,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    recruiter TEXT,
    status TEXT NOT NULL,
    reason TEXT,
    detail TEXT,
    time_filter TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_outcomes_run_id ON outcomes(run_id);
CREATE INDEX IF NOT EXISTS idx_outcomes_listing_id ON outcomes(listing_id);
CREATE INDEX IF NOT EXISTS idx_outcomes_status ON outcomes(status);
CREATE INDEX IF NOT EXISTS idx_outcomes_recorded_at ON outcomes(recorded_at);
"#;

/// SQLite-backed outcome log
pub struct SqliteOutcomeStore {
    conn: Mutex<Connection>,
}

impl SqliteOutcomeStore {
    /// Open (or create) the outcome database at `path`
    pub fn new(path: &Path) -> Result<Self, OutcomeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| OutcomeError::Database(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| OutcomeError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, OutcomeError> {
        let conn =
            Connection::open_in_memory().map_err(|e| OutcomeError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, OutcomeError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| OutcomeError::Database(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, OutcomeError> {
        self.conn
            .lock()
            .map_err(|_| OutcomeError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &OutcomeFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref run_id) = filter.run_id {
            conditions.push("run_id = ?");
            params.push(Box::new(run_id.clone()));
        }

        if let Some(ref group_id) = filter.group_id {
            conditions.push("group_id = ?");
            params.push(Box::new(group_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref from) = filter.from {
            conditions.push("recorded_at >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

/// Decode a snake_case enum stored as plain text.
fn decode_enum<T: DeserializeOwned>(value: &str) -> Result<T, OutcomeError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|e| OutcomeError::Serialization(format!("{}: {}", value, e)))
}

impl OutcomeStore for SqliteOutcomeStore {
    fn insert(&self, outcome: &ApplicationOutcome) -> Result<i64, OutcomeError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO outcomes (run_id, group_id, listing_id, title, company, recruiter, status, reason, detail, time_filter, recorded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                outcome.run_id,
                outcome.group_id,
                outcome.listing_id,
                outcome.title,
                outcome.company,
                outcome.recruiter,
                outcome.status.as_str(),
                outcome.reason.map(|r| r.as_str()),
                outcome.detail,
                outcome.time_filter.map(|t| t.as_str()),
                outcome.recorded_at.to_rfc3339(),
            ],
        )
        .map_err(|e| OutcomeError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &OutcomeFilter) -> Result<Vec<ApplicationOutcome>, OutcomeError> {
        let conn = self.lock()?;
        let (where_clause, mut params) = Self::build_where_clause(filter);

        let mut sql = format!(
            "SELECT run_id, group_id, listing_id, title, company, recruiter, status, reason, detail, time_filter, recorded_at \
             FROM outcomes {} ORDER BY id DESC",
            where_clause
        );
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| OutcomeError::Database(e.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })
            .map_err(|e| OutcomeError::Database(e.to_string()))?;

        let mut outcomes = Vec::new();
        for row in rows {
            let (
                run_id,
                group_id,
                listing_id,
                title,
                company,
                recruiter,
                status,
                reason,
                detail,
                time_filter,
                recorded_at,
            ) = row.map_err(|e| OutcomeError::Database(e.to_string()))?;

            let status = OutcomeStatus::parse(&status)
                .ok_or_else(|| OutcomeError::Serialization(format!("unknown status: {}", status)))?;
            let recorded_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| OutcomeError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            outcomes.push(ApplicationOutcome {
                run_id,
                group_id,
                listing_id,
                title,
                company,
                recruiter,
                status,
                reason: reason.as_deref().map(decode_enum).transpose()?,
                detail,
                time_filter: time_filter.as_deref().map(decode_enum).transpose()?,
                recorded_at,
            });
        }

        Ok(outcomes)
    }

    fn applied_ids(&self) -> Result<HashSet<String>, OutcomeError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT listing_id FROM outcomes WHERE status = ?")
            .map_err(|e| OutcomeError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![OutcomeStatus::Applied.as_str()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| OutcomeError::Database(e.to_string()))?;

        rows.collect::<Result<HashSet<_>, _>>()
            .map_err(|e| OutcomeError::Database(e.to_string()))
    }

    fn count_applied_since(&self, since: DateTime<Utc>) -> Result<u32, OutcomeError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM outcomes WHERE status = ? AND recorded_at >= ?",
                params![OutcomeStatus::Applied.as_str(), since.to_rfc3339()],
                |row| row.get(0),
            )
            .map_err(|e| OutcomeError::Database(e.to_string()))?;

        Ok(count as u32)
    }
}
