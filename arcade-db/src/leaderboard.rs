use arcade_core::error::ArcadeError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::ArcadeDb;

pub fn init_table(conn: &Connection) -> Result<(), ArcadeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS leaderboard_entries (
          id TEXT PRIMARY KEY,
          account_id TEXT NOT NULL,
          display_name TEXT NOT NULL,
          difficulty TEXT NOT NULL,
          score INTEGER NOT NULL,
          wave INTEGER NOT NULL,
          kills INTEGER NOT NULL,
          max_combo INTEGER NOT NULL,
          level INTEGER NOT NULL,
          is_victory INTEGER NOT NULL,
          game_duration_ms INTEGER NOT NULL,
          start_wave INTEGER NOT NULL,
          continues_used INTEGER NOT NULL,
          run_detail TEXT NOT NULL,
          submitted_at TEXT NOT NULL
        )",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_leaderboard_difficulty_score
         ON leaderboard_entries (difficulty, score DESC, wave DESC, submitted_at ASC)",
        (),
    )
    .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub id: String,
    pub account_id: String,
    pub display_name: String,
    pub difficulty: String,
    pub score: i64,
    pub wave: i64,
    pub kills: i64,
    pub max_combo: i64,
    pub level: i64,
    pub is_victory: bool,
    pub game_duration_ms: i64,
    pub start_wave: i64,
    pub continues_used: i64,
    pub run_detail: String,
    pub submitted_at: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
impl ArcadeDb {
    pub async fn insert_leaderboard_entry(
        &self,
        id: &str,
        account_id: &str,
        display_name: &str,
        difficulty: &str,
        score: i64,
        wave: i64,
        kills: i64,
        max_combo: i64,
        level: i64,
        is_victory: bool,
        game_duration_ms: i64,
        start_wave: i64,
        continues_used: i64,
        run_detail: &str,
    ) -> Result<i64, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO leaderboard_entries (
               id, account_id, display_name, difficulty, score, wave, kills, max_combo,
               level, is_victory, game_duration_ms, start_wave, continues_used, run_detail, submitted_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                id,
                account_id,
                display_name,
                difficulty,
                score,
                wave,
                kills,
                max_combo,
                level,
                is_victory as i64,
                game_duration_ms,
                start_wave,
                continues_used,
                run_detail,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let better: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM leaderboard_entries WHERE difficulty = ?1 AND score > ?2",
                params![difficulty, score],
                |row| row.get(0),
            )
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(better + 1)
    }

    pub async fn top_n(&self, difficulty: &str, limit: i64) -> Result<Vec<LeaderboardRow>, ArcadeError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, account_id, display_name, difficulty, score, wave, kills, max_combo,
                        level, is_victory, game_duration_ms, start_wave, continues_used, run_detail, submitted_at
                 FROM leaderboard_entries WHERE difficulty = ?1
                 ORDER BY score DESC, wave DESC, submitted_at ASC
                 LIMIT ?2",
            )
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        let rows = stmt
            .query_map(params![difficulty, limit], map_row)
            .map_err(|e| ArcadeError::Internal(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(rows)
    }

    pub async fn count_in_difficulty(&self, difficulty: &str) -> Result<i64, ArcadeError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM leaderboard_entries WHERE difficulty = ?1",
            params![difficulty],
            |row| row.get(0),
        )
        .map_err(|e| ArcadeError::Internal(e.to_string()))
    }

    pub async fn user_best_rank(
        &self,
        account_id: &str,
        difficulty: &str,
    ) -> Result<Option<i64>, ArcadeError> {
        let conn = self.conn.lock().await;
        let best_score: Option<i64> = conn
            .query_row(
                "SELECT MAX(score) FROM leaderboard_entries WHERE account_id = ?1 AND difficulty = ?2",
                params![account_id, difficulty],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ArcadeError::Internal(e.to_string()))?
            .flatten();

        let Some(best_score) = best_score else {
            return Ok(None);
        };

        let better: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM leaderboard_entries WHERE difficulty = ?1 AND score > ?2",
                params![difficulty, best_score],
                |row| row.get(0),
            )
            .map_err(|e| ArcadeError::Internal(e.to_string()))?;

        Ok(Some(better + 1))
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<LeaderboardRow> {
    let submitted_at: String = row.get(14)?;
    Ok(LeaderboardRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        display_name: row.get(2)?,
        difficulty: row.get(3)?,
        score: row.get(4)?,
        wave: row.get(5)?,
        kills: row.get(6)?,
        max_combo: row.get(7)?,
        level: row.get(8)?,
        is_victory: row.get::<_, i64>(9)? != 0,
        game_duration_ms: row.get(10)?,
        start_wave: row.get(11)?,
        continues_used: row.get(12)?,
        run_detail: row.get(13)?,
        submitted_at: submitted_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rank_reflects_strictly_higher_scores_in_partition() {
        let db = ArcadeDb::try_new_mem().unwrap();
        let rank1 = db
            .insert_leaderboard_entry("e1", "acct-1", "Alice", "hard", 1000, 5, 10, 3, 2, false, 60_000, 1, 0, "{}")
            .await
            .unwrap();
        assert_eq!(rank1, 1);

        let rank2 = db
            .insert_leaderboard_entry("e2", "acct-2", "Bob", "hard", 2000, 6, 20, 4, 3, false, 90_000, 1, 0, "{}")
            .await
            .unwrap();
        assert_eq!(rank2, 1);

        let top = db.top_n("hard", 10).await.unwrap();
        assert_eq!(top[0].account_id, "acct-2");
        assert_eq!(top[1].account_id, "acct-1");
    }
}
