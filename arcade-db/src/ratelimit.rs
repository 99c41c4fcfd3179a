use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS rate_limit_counters (
          scope_key TEXT NOT NULL,
          operation TEXT NOT NULL,
          window_start TEXT NOT NULL,
          count INTEGER NOT NULL,
          PRIMARY KEY (scope_key, operation)
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    Ok(())
}

impl ArcadeDb {
    /// Sliding-window rate limit keyed by `(scope_key, operation)`. Returns
    /// `Err(Throttled)` with a retry hint once `limit` is exceeded within
    /// `window_secs`; otherwise increments the counter and returns `Ok(())`.
    pub async fn check_and_increment(
        &self,
        scope_key: &str,
        operation: &str,
        window_secs: i64,
        limit: i64,
    ) -> Result<(), ArcadeError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let now = Utc::now();
        let existing: Option<(String, i64)> = tx
            .query_row(
                "SELECT window_start, count FROM rate_limit_counters WHERE scope_key = ?1 AND operation = ?2",
                params![scope_key, operation],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let (window_start, count) = match existing {
            Some((window_start_str, count)) => {
                let window_start: DateTime<Utc> = window_start_str.parse().unwrap_or(now);
                if (now - window_start).num_seconds() >= window_secs {
                    (now, 0)
                } else {
                    (window_start, count)
                }
            }
            None => (now, 0),
        };

        if count >= limit {
            let elapsed = (now - window_start).num_seconds().max(0);
            let retry_after_secs = (window_secs - elapsed).max(1) as u64;
            return Err(ArcadeError::Throttled { retry_after_secs });
        }

        tx.execute(
            "INSERT INTO rate_limit_counters (scope_key, operation, window_start, count) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope_key, operation) DO UPDATE SET window_start = excluded.window_start, count = excluded.count",
            params![scope_key, operation, window_start.to_rfc3339(), count + 1],
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
    async fn throttles_after_limit_is_reached() {
        let db = ArcadeDb::try_new_mem().unwrap();
        for _ in 0..5 {
            db.check_and_increment("ip:1.2.3.4", "login", 60, 5).await.unwrap();
        }
        let err = db.check_and_increment("ip:1.2.3.4", "login", 60, 5).await.unwrap_err();
        match err {
            ArcadeError::Throttled { retry_after_secs } => assert!(retry_after_secs > 0),
            other => panic!("expected Throttled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn different_scopes_are_independent() {
        let db = ArcadeDb::try_new_mem().unwrap();
        for _ in 0..5 {
            db.check_and_increment("ip:1.2.3.4", "login", 60, 5).await.unwrap();
        }
        db.check_and_increment("ip:5.6.7.8", "login", 60, 5).await.unwrap();
    }
}
