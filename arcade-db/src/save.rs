use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS saves (
          account_id TEXT PRIMARY KEY,
          schema_version INTEGER NOT NULL,
          save_data TEXT NOT NULL,
          wave INTEGER NOT NULL,
          game_state TEXT NOT NULL,
          fingerprint TEXT NOT NULL,
          updated_at TEXT NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SaveRow {
    pub schema_version: i64,
    pub save_data: String,
    pub wave: i64,
    pub game_state: String,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

pub fn fingerprint_of(save_data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(save_data.as_bytes());
    hex::encode(hasher.finalize())
}

impl ArcadeDb {
    /// Upsert the save for `account_id`. If `expected_fingerprint` is given
    /// and the account already has a save whose fingerprint differs, the
    /// write is rejected with [`ArcadeError::Conflict`] and nothing is
    /// written. Passing `None` always writes (the client "insisting").
    pub async fn write_save(
        &self,
        account_id: &str,
        schema_version: i64,
        save_data: &str,
        wave: i64,
        game_state: &str,
        expected_fingerprint: Option<&str>,
    ) -> Result<String, ArcadeError> {
        let conn = self.conn.lock().await;

        if let Some(expected) = expected_fingerprint {
            let current: Option<String> = conn
                .query_row(
                    "SELECT fingerprint FROM saves WHERE account_id = ?1",
                    params![account_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| ArcadeError::Internal(e.to_string()))?;
            if let Some(current) = current {
                if current != expected {
                    return Err(ArcadeError::Conflict);
                }
            }
        }

        let fingerprint = fingerprint_of(save_data);
        conn.execute(
            "INSERT INTO saves (account_id, schema_version, save_data, wave, game_state, fingerprint, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(account_id) DO UPDATE SET
               schema_version = excluded.schema_version,
               save_data = excluded.save_data,
               wave = excluded.wave,
               game_state = excluded.game_state,
               fingerprint = excluded.fingerprint,
               updated_at = excluded.updated_at",
            params![
                account_id,
                schema_version,
                save_data,
                wave,
                game_state,
                fingerprint,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(fingerprint)
    }

    pub async fn read_save(&self, account_id: &str) -> Result<Option<SaveRow>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT schema_version, save_data, wave, game_state, fingerprint, updated_at
             FROM saves WHERE account_id = ?1",
            params![account_id],
            |row| {
                let updated_at: String = row.get(5)?;
                Ok(SaveRow {
                    schema_version: row.get(0)?,
                    save_data: row.get(1)?,
                    wave: row.get(2)?,
                    game_state: row.get(3)?,
                    fingerprint: row.get(4)?,
                    updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
                })
            },
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn delete_save(&self, account_id: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM saves WHERE account_id = ?1", params![account_id])
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn get_fingerprint(&self, account_id: &str) -> Result<Option<String>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT fingerprint FROM saves WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_and_matches_fingerprint() {
        let db = ArcadeDb::try_new_mem().unwrap();
        let fp = db
            .write_save("acct-1", 1, "{\"hp\":10}", 7, "paused", None)
            .await
            .unwrap();
        let row = db.read_save("acct-1").await.unwrap().unwrap();
        assert_eq!(row.save_data, "{\"hp\":10}");
        assert_eq!(row.fingerprint, fp);
    }

    #[tokio::test]
    async fn stale_fingerprint_is_rejected() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.write_save("acct-1", 1, "{\"hp\":10}", 7, "paused", None)
            .await
            .unwrap();
        let err = db
            .write_save("acct-1", 1, "{\"hp\":5}", 8, "paused", Some("not-the-real-fingerprint"))
            .await
            .unwrap_err();
        assert_eq!(err, ArcadeError::Conflict);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.write_save("acct-1", 1, "{}", 1, "playing", None).await.unwrap();
        db.delete_save("acct-1").await.unwrap();
        assert!(db.read_save("acct-1").await.unwrap().is_none());
    }
}
