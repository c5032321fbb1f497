use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use super::schema::initialize_schema;
use crate::error::{Result, StoreError};

/// A SQLite connection wrapper. `rusqlite::Connection` is `!Sync`, so access
/// from multiple threads (the coordinator's worker pool) goes through a
/// mutex; each operation is a short-lived statement, never a held
/// transaction across an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_file(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Initialization(e.to_string()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    pub(crate) fn with_connection_mut<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }
}
