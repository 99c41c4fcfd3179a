use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta_progression (
          account_id TEXT PRIMARY KEY,
          data TEXT NOT NULL,
          schema_version INTEGER NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS achievements (
          account_id TEXT NOT NULL,
          achievement_id TEXT NOT NULL,
          unlocked_at TEXT NOT NULL,
          PRIMARY KEY (account_id, achievement_id)
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    Ok(())
}

impl ArcadeDb {
    pub async fn load_meta(&self, account_id: &str) -> Result<Option<(String, i64)>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT data, schema_version FROM meta_progression WHERE account_id = ?1",
            params![account_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    /// Overwrites wholesale; no merge is attempted, matching the
    /// last-write-wins contract documented for this endpoint.
    pub async fn store_meta(&self, account_id: &str, data: &str, schema_version: i64) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO meta_progression (account_id, data, schema_version) VALUES (?1, ?2, ?3)
             ON CONFLICT(account_id) DO UPDATE SET data = excluded.data, schema_version = excluded.schema_version",
            params![account_id, data, schema_version],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn load_achievements(&self, account_id: &str) -> Result<Vec<(String, DateTime<Utc>)>, ArcadeError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT achievement_id, unlocked_at FROM achievements WHERE account_id = ?1")
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        let rows = stmt
            .query_map(params![account_id], |row| {
                let unlocked_at: String = row.get(1)?;
                Ok((row.get::<_, String>(0)?, unlocked_at.parse().unwrap_or_else(|_| Utc::now())))
            })
            .map_err(|e| ArcadeError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(rows)
    }

    /// Insert-if-absent: unlocking an already-unlocked achievement is a
    /// no-op, not an error.
    pub async fn unlock_achievement(&self, account_id: &str, achievement_id: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO achievements (account_id, achievement_id, unlocked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(account_id, achievement_id) DO NOTHING",
            params![account_id, achievement_id, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlocking_twice_is_idempotent() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.unlock_achievement("acct-1", "first-blood").await.unwrap();
        db.unlock_achievement("acct-1", "first-blood").await.unwrap();
        let list = db.load_achievements("acct-1").await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn meta_progression_defaults_when_absent() {
        let db = ArcadeDb::try_new_mem().unwrap();
        assert!(db.load_meta("acct-1").await.unwrap().is_none());
        db.store_meta("acct-1", "{\"unlocks\":[]}", 1).await.unwrap();
        let (data, version) = db.load_meta("acct-1").await.unwrap().unwrap();
        assert_eq!(data, "{\"unlocks\":[]}");
        assert_eq!(version, 1);
    }
}
