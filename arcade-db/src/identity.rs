use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
          id TEXT PRIMARY KEY,
          email TEXT UNIQUE,
          display_name TEXT NOT NULL,
          password_hash TEXT,
          provider TEXT NOT NULL,
          verification TEXT NOT NULL,
          created_at TEXT NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS verification_codes (
          email TEXT NOT NULL,
          purpose TEXT NOT NULL,
          code TEXT NOT NULL,
          account_id TEXT,
          expires_at TEXT NOT NULL,
          attempts INTEGER NOT NULL DEFAULT 0,
          PRIMARY KEY (email, purpose)
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS refresh_sessions (
          token TEXT PRIMARY KEY,
          account_id TEXT NOT NULL,
          expires_at TEXT NOT NULL,
          revoked INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub verification: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VerificationCodeRow {
    pub code: String,
    pub account_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub attempts: i64,
}

impl ArcadeDb {
    pub async fn insert_account(
        &self,
        id: &str,
        email: Option<&str>,
        display_name: &str,
        password_hash: Option<&str>,
        provider: &str,
        verification: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO accounts (id, email, display_name, password_hash, provider, verification, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, email, display_name, password_hash, provider, verification, created_at.to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRow>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, email, display_name, password_hash, provider, verification, created_at
             FROM accounts WHERE email = ?1",
            params![email],
            map_account_row,
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn find_account_by_id(&self, id: &str) -> Result<Option<AccountRow>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, email, display_name, password_hash, provider, verification, created_at
             FROM accounts WHERE id = ?1",
            params![id],
            map_account_row,
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn mark_verified(&self, id: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE accounts SET verification = 'verified' WHERE id = ?1",
            params![id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE accounts SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn upsert_verification_code(
        &self,
        email: &str,
        purpose: &str,
        code: &str,
        account_id: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO verification_codes (email, purpose, code, account_id, expires_at, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)
             ON CONFLICT(email, purpose) DO UPDATE SET
               code = excluded.code,
               account_id = excluded.account_id,
               expires_at = excluded.expires_at,
               attempts = 0",
            params![email, purpose, code, account_id, expires_at.to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn get_verification_code(
        &self,
        email: &str,
        purpose: &str,
    ) -> Result<Option<VerificationCodeRow>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT code, account_id, expires_at, attempts FROM verification_codes WHERE email = ?1 AND purpose = ?2",
            params![email, purpose],
            |row| {
                Ok(VerificationCodeRow {
                    code: row.get(0)?,
                    account_id: row.get(1)?,
                    expires_at: row
                        .get::<_, String>(2)?
                        .parse()
                        .unwrap_or_else(|_| Utc::now()),
                    attempts: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn increment_code_attempts(&self, email: &str, purpose: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE verification_codes SET attempts = attempts + 1 WHERE email = ?1 AND purpose = ?2",
            params![email, purpose],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn delete_verification_code(&self, email: &str, purpose: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM verification_codes WHERE email = ?1 AND purpose = ?2",
            params![email, purpose],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn insert_refresh_session(
        &self,
        token: &str,
        account_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO refresh_sessions (token, account_id, expires_at, revoked) VALUES (?1, ?2, ?3, 0)",
            params![token, account_id, expires_at.to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Returns (account_id, expires_at, revoked).
    pub async fn get_refresh_session(
        &self,
        token: &str,
    ) -> Result<Option<(String, DateTime<Utc>, bool)>, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT account_id, expires_at, revoked FROM refresh_sessions WHERE token = ?1",
            params![token],
            |row| {
                let account_id: String = row.get(0)?;
                let expires_at: String = row.get(1)?;
                let revoked: i64 = row.get(2)?;
                Ok((
                    account_id,
                    expires_at.parse().unwrap_or_else(|_| Utc::now()),
                    revoked != 0,
                ))
            },
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn revoke_refresh_session(&self, token: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE refresh_sessions SET revoked = 1 WHERE token = ?1",
            params![token],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Reuse of a revoked refresh token is a credential-compromise signal:
    /// the whole session family for the account is torn down.
    pub async fn revoke_all_refresh_sessions_for_account(&self, account_id: &str) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE refresh_sessions SET revoked = 1 WHERE account_id = ?1",
            params![account_id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }
}

fn map_account_row(row: &rusqlite::Row) -> rusqlite::Result<AccountRow> {
    let created_at: String = row.get(6)?;
    Ok(AccountRow {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        provider: row.get(4)?,
        verification: row.get(5)?,
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inserts_and_finds_account_by_email() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.insert_account(
            "acct-1",
            Some("alice@example.com"),
            "Alice",
            Some("hash"),
            "email",
            "pending",
            Utc::now(),
        )
        .await
        .unwrap();

        let found = db.find_account_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, "acct-1");
        assert_eq!(found.verification, "pending");

        db.mark_verified("acct-1").await.unwrap();
        let found = db.find_account_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.verification, "verified");
    }

    #[tokio::test]
    async fn verification_code_is_superseded_by_a_new_one() {
        let db = ArcadeDb::try_new_mem().unwrap();
        let expiry = Utc::now();
        db.upsert_verification_code("alice@example.com", "register", "111111", None, expiry)
            .await
            .unwrap();
        db.upsert_verification_code("alice@example.com", "register", "222222", None, expiry)
            .await
            .unwrap();

        let row = db
            .get_verification_code("alice@example.com", "register")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.code, "222222");
        assert_eq!(row.attempts, 0);
    }

    #[tokio::test]
    async fn refresh_session_reuse_detection() {
        let db = ArcadeDb::try_new_mem().unwrap();
        let expiry = Utc::now() + chrono::Duration::weeks(2);
        db.insert_refresh_session("r1", "acct-1", expiry).await.unwrap();
        db.revoke_refresh_session("r1").await.unwrap();
        let (_, _, revoked) = db.get_refresh_session("r1").await.unwrap().unwrap();
        assert!(revoked);
    }
}
