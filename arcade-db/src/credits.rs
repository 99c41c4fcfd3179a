use arcade_core::error::ArcadeError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS credit_ledger (
          account_id TEXT PRIMARY KEY,
          free_remaining INTEGER NOT NULL,
          purchased INTEGER NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledger_events (
          external_event_id TEXT PRIMARY KEY,
          account_id TEXT NOT NULL,
          credits_granted INTEGER NOT NULL,
          recorded_at TEXT NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct Balance {
    pub free_remaining: i64,
    pub purchased: i64,
}

impl ArcadeDb {
    pub async fn seed_starter_credits(&self, account_id: &str, starter_free: i64) -> Result<(), ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO credit_ledger (account_id, free_remaining, purchased) VALUES (?1, ?2, 0)
             ON CONFLICT(account_id) DO NOTHING",
            params![account_id, starter_free],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
        Ok(())
    }

    pub async fn get_balance(&self, account_id: &str) -> Result<Balance, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT free_remaining, purchased FROM credit_ledger WHERE account_id = ?1",
            params![account_id],
            |row| {
                Ok(Balance {
                    free_remaining: row.get(0)?,
                    purchased: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| ArcadeError::Internal(e.to_string()))
        .map(|b| b.unwrap_or(Balance { free_remaining: 0, purchased: 0 }))
    }

    /// Decrement one credit, consuming `free_remaining` first. Serialized
    /// against concurrent callers by the exclusive database transaction,
    /// giving every pair of concurrent spends for the same account a strict
    /// total order.
    pub async fn spend_one(&self, account_id: &str) -> Result<Balance, ArcadeError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let balance: Balance = tx
            .query_row(
                "SELECT free_remaining, purchased FROM credit_ledger WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(Balance {
                        free_remaining: row.get(0)?,
                        purchased: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?
            .unwrap_or(Balance { free_remaining: 0, purchased: 0 });

        if balance.free_remaining + balance.purchased <= 0 {
            return Err(ArcadeError::InsufficientCredits);
        }

        let (new_free, new_purchased) = if balance.free_remaining > 0 {
            (balance.free_remaining - 1, balance.purchased)
        } else {
            (balance.free_remaining, balance.purchased - 1)
        };

        tx.execute(
            "UPDATE credit_ledger SET free_remaining = ?1, purchased = ?2 WHERE account_id = ?3",
            params![new_free, new_purchased, account_id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        tx.commit().map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(Balance {
            free_remaining: new_free,
            purchased: new_purchased,
        })
    }

    /// Idempotent on `external_event_id`: if a ledger event already exists
    /// for it, the transaction is a no-op and `Ok(None)` is returned.
    pub async fn grant_purchased(
        &self,
        account_id: &str,
        amount: i64,
        external_event_id: &str,
    ) -> Result<Option<Balance>, ArcadeError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let already: Option<String> = tx
            .query_row(
                "SELECT external_event_id FROM ledger_events WHERE external_event_id = ?1",
                params![external_event_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        if already.is_some() {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO credit_ledger (account_id, free_remaining, purchased) VALUES (?1, 0, 0)
             ON CONFLICT(account_id) DO NOTHING",
            params![account_id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        tx.execute(
            "UPDATE credit_ledger SET purchased = purchased + ?1 WHERE account_id = ?2",
            params![amount, account_id],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        tx.execute(
            "INSERT INTO ledger_events (external_event_id, account_id, credits_granted, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![external_event_id, account_id, amount, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let balance: Balance = tx
            .query_row(
                "SELECT free_remaining, purchased FROM credit_ledger WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(Balance {
                        free_remaining: row.get(0)?,
                        purchased: row.get(1)?,
                    })
                },
            )
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        tx.commit().map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(Some(balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spends_free_before_purchased() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.seed_starter_credits("acct-1", 1).await.unwrap();
        db.grant_purchased("acct-1", 5, "evt-1").await.unwrap();

        let b = db.spend_one("acct-1").await.unwrap();
        assert_eq!(b.free_remaining, 0);
        assert_eq!(b.purchased, 5);

        let b = db.spend_one("acct-1").await.unwrap();
        assert_eq!(b.free_remaining, 0);
        assert_eq!(b.purchased, 4);
    }

    #[tokio::test]
    async fn spend_fails_when_exhausted() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.seed_starter_credits("acct-1", 0).await.unwrap();
        let err = db.spend_one("acct-1").await.unwrap_err();
        assert_eq!(err, ArcadeError::InsufficientCredits);
    }

    #[tokio::test]
    async fn duplicate_webhook_event_grants_once() {
        let db = ArcadeDb::try_new_mem().unwrap();
        db.seed_starter_credits("acct-1", 0).await.unwrap();

        let first = db.grant_purchased("acct-1", 10, "evt-abc").await.unwrap();
        assert!(first.is_some());
        let second = db.grant_purchased("acct-1", 10, "evt-abc").await.unwrap();
        assert!(second.is_none());

        let balance = db.get_balance("acct-1").await.unwrap();
        assert_eq!(balance.purchased, 10);
    }
}
