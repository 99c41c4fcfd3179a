use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use subtle::ConstantTimeEq;

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS continue_tokens (
          nonce TEXT PRIMARY KEY,
          account_id TEXT NOT NULL,
          fingerprint TEXT NOT NULL,
          issued_at TEXT NOT NULL,
          consumed INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    Ok(())
}

impl ArcadeDb {
    pub async fn record_continue_issued(
        &self,
        nonce: &str,
        account_id: &str,
        fingerprint: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO continue_tokens (nonce, account_id, fingerprint, issued_at, consumed)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![nonce, account_id, fingerprint, issued_at.to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Verify and consume a continue token nonce. Fails if the nonce is
    /// unknown, already consumed, bound to a different account, or its
    /// bound fingerprint no longer matches `current_fingerprint` (the save
    /// was overwritten between request and redeem).
    pub async fn consume_continue(
        &self,
        nonce: &str,
        account_id: &str,
        current_fingerprint: &str,
    ) -> Result<(), ArcadeError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let row: Option<(String, String, i64)> = tx
            .query_row(
                "SELECT account_id, fingerprint, consumed FROM continue_tokens WHERE nonce = ?1",
                params![nonce],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let Some((bound_account, bound_fingerprint, consumed)) = row else {
            return Err(ArcadeError::BadSession);
        };

        if consumed != 0 {
            return Err(ArcadeError::BadSession);
        }
        if bound_account != account_id {
            return Err(ArcadeError::BadSession);
        }
        let fingerprints_match: bool = bound_fingerprint
            .as_bytes()
            .ct_eq(current_fingerprint.as_bytes())
            .into();
        if !fingerprints_match {
            return Err(ArcadeError::BadSession);
        }

        tx.execute(
            "UPDATE continue_tokens SET consumed = 1 WHERE nonce = ?1",
            params![nonce],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        tx.commit().map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redeem_succeeds_once_then_fails() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.record_continue_issued("nonce-1", "acct-1", "fp-1", Utc::now())
            .await
            .unwrap();

        db.consume_continue("nonce-1", "acct-1", "fp-1").await.unwrap();
        let err = db.consume_continue("nonce-1", "acct-1", "fp-1").await.unwrap_err();
        assert_eq!(err, ArcadeError::BadSession);
    }

    #[tokio::test]
    async fn redeem_fails_when_save_was_overwritten() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.record_continue_issued("nonce-2", "acct-1", "fp-original", Utc::now())
            .await
            .unwrap();
        let err = db
            .consume_continue("nonce-2", "acct-1", "fp-after-overwrite")
            .await
            .unwrap_err();
        assert_eq!(err, ArcadeError::BadSession);
    }
}
