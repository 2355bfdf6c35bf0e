use crate::core::db;
use crate::core::error;
use crate::core::store::Store;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Single entry point for store access.
///
/// Each call opens a fresh connection, runs the closure inside one
/// transaction, and appends an audit event. The connection is dropped on
/// every exit path.
pub struct DbBroker {
    db_path: PathBuf,
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub course: Option<String>,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(store: &Store) -> Self {
        Self {
            db_path: store.db_path(),
            audit_log_path: store.audit_log_path(),
        }
    }

    /// Execute a closure inside a transaction. Commits on `Ok`, rolls back on `Err`.
    /// Audit append failures are logged and never change the returned result.
    pub fn with_conn<F, R>(
        &self,
        course: Option<&str>,
        op_name: &str,
        f: F,
    ) -> Result<R, error::UlwaziError>
    where
        F: FnOnce(&Connection) -> Result<R, error::UlwaziError>,
    {
        let db_id = self
            .db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        tracing::debug!(op = op_name, course, db = %db_id, "store op start");

        let mut conn = db::db_connect(&self.db_path)?;
        let tx = conn.transaction()?;
        let result: Result<R, error::UlwaziError> = match f(&*tx) {
            Ok(value) => tx.commit().map(|_| value).map_err(Into::into),
            Err(e) => {
                // Dropping the transaction rolls it back.
                drop(tx);
                Err(e)
            }
        };

        let status = if result.is_ok() { "success" } else { "error" };
        tracing::debug!(op = op_name, status, "store op end");
        // The store outcome stands whether or not the audit line lands.
        if let Err(e) = self.log_event(course, op_name, &db_id, status) {
            tracing::warn!(op = op_name, error = %e, "audit log append failed");
        }

        result
    }

    fn log_event(
        &self,
        course: Option<&str>,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::UlwaziError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            course: course.map(|s| s.to_string()),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let line = serde_json::to_string(&ev)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::UlwaziError::IoError)?;

        writeln!(f, "{}", line).map_err(error::UlwaziError::IoError)?;
        Ok(())
    }
}

/// Read back every event recorded in the audit log.
pub fn read_audit_log(store: &Store) -> Result<Vec<BrokerEvent>, error::UlwaziError> {
    let path = store.audit_log_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(error::UlwaziError::from))
        .collect()
}
