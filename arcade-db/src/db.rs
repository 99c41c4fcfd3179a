use std::sync::Arc;

use arcade_core::error::ArcadeError;
use rusqlite::Connection;
use tokio::sync::Mutex;

/// Shared SQLite handle for every persistence concern in the backend.
///
/// A single connection behind a mutex is sufficient for SQLite's
/// single-writer model and mirrors the reference backend's local-storage
/// crate; a deployment against a multi-writer engine would swap this for a
/// real connection pool without changing any of the module interfaces built
/// on top of it.
#[derive(Clone)]
pub struct ArcadeDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ArcadeDb {
    pub fn try_new_mem() -> Result<Self, ArcadeError> {
        let conn = Connection::open_in_memory().map_err(|e| ArcadeError::Internal(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn try_new(db_file_path: &str) -> Result<Self, ArcadeError> {
        let conn = Connection::open(db_file_path).map_err(|e| ArcadeError::Internal(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

pub fn init_schema(conn: &Connection) -> Result<(), ArcadeError> {
    crate::identity::init_table(conn)?;
    crate::save::init_table(conn)?;
    crate::credits::init_table(conn)?;
    crate::continue_flow::init_table(conn)?;
    crate::leaderboard::init_table(conn)?;
    crate::meta::init_table(conn)?;
    crate::ratelimit::init_table(conn)?;
    Ok(())
}
