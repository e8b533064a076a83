//! SQLite session log.
//!
//! Two tables:
//!
//! - `logs` receives one row per [`WorkflowEvent`], making the log an
//!   [`EventSink`]
//! - `sessions` holds the client records an operator worked on, with the
//!   search results seen and the outcome
//!
//! The connection is guarded by a mutex; every call is a short local
//! statement.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use fiscorelay_core::{EventSink, WorkflowEvent};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    client_data TEXT,
    search_results TEXT,
    status TEXT,
    created_client_id TEXT
);
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    level TEXT,
    message TEXT,
    data TEXT
);
";

/// Sessions included in an export.
const EXPORT_LIMIT: usize = 1000;

/// CSV export columns.
pub const CSV_HEADER: [&str; 5] = ["ID", "Timestamp", "Ragione Sociale", "Status", "Created Client ID"];

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

// ============================================================================
// Records
// ============================================================================

/// A session to save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session id.
    pub id: String,
    /// Client record as edited by the operator.
    #[serde(default)]
    pub client_data: Value,
    /// Search results shown for the client.
    #[serde(default)]
    pub search_results: Value,
    /// Outcome label.
    #[serde(default)]
    pub status: String,
    /// Provider id of a customer created during the session.
    #[serde(default)]
    pub created_client_id: Option<String>,
}

impl SessionRecord {
    /// Creates a record with a fresh id.
    pub fn new(client_data: Value, search_results: Value, status: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_data,
            search_results,
            status: status.into(),
            created_client_id: None,
        }
    }

    /// Sets the created customer id.
    pub fn with_created_client_id(mut self, id: impl Into<String>) -> Self {
        self.created_client_id = Some(id.into());
        self
    }
}

/// A saved session, as read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSession {
    /// Session id.
    pub id: String,
    /// When the session was saved.
    pub timestamp: String,
    /// Client record.
    pub client_data: Value,
    /// Search results.
    pub search_results: Value,
    /// Outcome label.
    pub status: Option<String>,
    /// Created customer id.
    pub created_client_id: Option<String>,
}

/// One row of the session listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Session id.
    pub id: String,
    /// When the session was saved.
    pub timestamp: String,
    /// Outcome label.
    pub status: Option<String>,
    /// Created customer id.
    pub created_client_id: Option<String>,
    /// Client legal name.
    pub ragione_sociale: Option<String>,
}

/// One row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Row id.
    pub id: i64,
    /// When the entry was written.
    pub timestamp: String,
    /// `info`, `warn` or `error`.
    pub level: String,
    /// Short message.
    pub message: String,
    /// Redacted event payload.
    pub data: Option<Value>,
}

fn parse_json(raw: Option<String>, fallback: Value) -> Value {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(fallback)
}

// ============================================================================
// Session Log
// ============================================================================

/// SQLite-backed event and session log.
pub struct SessionLog {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SessionLog {
    /// Opens or creates the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened session log");
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a throwaway in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Returns the database path; `None` for in-memory logs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Logs
    // ========================================================================

    /// Appends a log entry and returns its row id.
    pub fn log(&self, level: &str, message: &str, data: Option<&Value>) -> Result<i64, StoreError> {
        let data = data.map(serde_json::to_string).transpose()?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO logs (timestamp, level, message, data) VALUES (?1, ?2, ?3, ?4)",
            params![now(), level, message, data],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the latest log entries, newest first.
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, level, message, data FROM logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(LogEntry {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                level: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                message: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                data: row
                    .get::<_, Option<String>>(4)?
                    .and_then(|s| serde_json::from_str(&s).ok()),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Saves a session, replacing any session with the same id.
    pub fn save_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let client_data = serde_json::to_string(&record.client_data)?;
        let search_results = serde_json::to_string(&record.search_results)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO sessions
                (id, timestamp, client_data, search_results, status, created_client_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                now(),
                client_data,
                search_results,
                record.status,
                record.created_client_id
            ],
        )?;
        debug!(session_id = %record.id, status = %record.status, "Session saved");

        self.log(
            "info",
            "Session saved",
            Some(&json!({ "sessionId": record.id, "status": record.status })),
        )?;
        Ok(())
    }

    /// Returns a saved session.
    pub fn get_session(&self, id: &str) -> Result<Option<StoredSession>, StoreError> {
        let conn = self.conn();
        let session = conn
            .query_row(
                "SELECT id, timestamp, client_data, search_results, status, created_client_id
                 FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StoredSession {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        client_data: parse_json(row.get(2)?, json!({})),
                        search_results: parse_json(row.get(3)?, json!([])),
                        status: row.get(4)?,
                        created_client_id: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Returns the latest sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, status, created_client_id, client_data
             FROM sessions ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let client_data = parse_json(row.get(4)?, Value::Null);
            Ok(SessionSummary {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                status: row.get(2)?,
                created_client_id: row.get(3)?,
                ragione_sociale: client_data
                    .get("ragioneSociale")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Exports the latest sessions as CSV.
    pub fn export_csv(&self) -> Result<String, StoreError> {
        let sessions = self.recent_sessions(EXPORT_LIMIT)?;
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(CSV_HEADER)?;
        for session in &sessions {
            wtr.write_record([
                session.id.as_str(),
                session.timestamp.as_str(),
                session.ragione_sociale.as_deref().unwrap_or_default(),
                session.status.as_deref().unwrap_or_default(),
                session.created_client_id.as_deref().unwrap_or_default(),
            ])?;
        }
        let bytes = wtr.into_inner().map_err(|e| StoreError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| StoreError::Csv(e.to_string()))
    }

    /// Exports the latest sessions as a JSON document.
    pub fn export_json(&self) -> Result<Value, StoreError> {
        let sessions = self.recent_sessions(EXPORT_LIMIT)?;
        Ok(json!({
            "sessions": sessions,
            "exportedAt": Utc::now().to_rfc3339(),
        }))
    }
}

impl EventSink for SessionLog {
    fn observe(&self, event: &WorkflowEvent) {
        if let Err(e) = self.log(event.level().as_str(), event.message(), Some(&event.payload())) {
            warn!(error = %e, event = event.message(), "Failed to write session log");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
