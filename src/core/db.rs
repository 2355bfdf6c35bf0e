use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use crate::core::store::Store;
use rusqlite::Connection;
use std::path::Path;

pub fn db_connect(db_path: &Path) -> Result<Connection, error::UlwaziError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::UlwaziError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::UlwaziError::RusqliteError)?;
    Ok(conn)
}

/// Create the three tables and their indexes. Safe to run on every start.
pub fn initialize_db(store: &Store) -> Result<(), error::UlwaziError> {
    let broker = DbBroker::new(store);
    broker.with_conn(None, "schema.init", |conn| {
        for stmt in schemas::ULWAZI_DB_SCHEMA {
            conn.execute_batch(stmt)?;
        }
        Ok(())
    })
}

/// Names of the tables currently present, sorted.
pub fn table_names(store: &Store) -> Result<Vec<String>, error::UlwaziError> {
    let conn = db_connect(&store.db_path())?;
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}
