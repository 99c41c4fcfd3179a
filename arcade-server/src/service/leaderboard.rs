use arcade_core::canonical::canonical_checksum_input;
use arcade_core::domain::{LeaderboardEntry, LeaderboardSubmission};
use arcade_core::error::{ArcadeError, ArcadeResult};
use arcade_crypto::HmacSigner;
use uuid::Uuid;

use crate::state::AppState;

pub struct SubmitOutcome {
    pub entry: LeaderboardEntry,
    pub rank: i64,
}

pub async fn submit(
    state: &AppState,
    account_id: Uuid,
    display_name: &str,
    submission: LeaderboardSubmission,
    game_session_token: &str,
    checksum: &str,
) -> ArcadeResult<SubmitOutcome> {
    let hmac_key = state
        .run_sessions
        .consume_leaderboard_session(game_session_token, &account_id.to_string())
        .await?;

    let canonical = canonical_checksum_input(&submission);
    HmacSigner::verify_with_key(&hmac_key, canonical.as_bytes(), checksum).map_err(|_| ArcadeError::BadChecksum)?;

    let id = Uuid::new_v4().to_string();
    let run_detail = serde_json::to_string(&submission.run_detail).map_err(|e| ArcadeError::Internal(e.to_string()))?;

    let rank = state
        .db
        .insert_leaderboard_entry(
            &id,
            &account_id.to_string(),
            display_name,
            &submission.difficulty,
            submission.score,
            submission.wave,
            submission.kills,
            submission.max_combo,
            submission.level,
            submission.is_victory,
            submission.game_duration_ms,
            submission.start_wave,
            submission.continues_used,
            &run_detail,
        )
        .await?;

    let entry = LeaderboardEntry {
        account_id,
        display_name: display_name.to_string(),
        submission,
        submitted_at: chrono::Utc::now(),
    };

    Ok(SubmitOutcome { entry, rank })
}

pub struct TopEntry {
    pub row: arcade_db::LeaderboardRow,
    pub rank: i64,
}

pub async fn top_n(state: &AppState, difficulty: &str, limit: i64) -> ArcadeResult<Vec<TopEntry>> {
    let rows = state.db.top_n(difficulty, limit).await?;
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        out.push(TopEntry {
            row,
            rank: i as i64 + 1,
        });
    }
    Ok(out)
}

pub async fn user_best_rank(state: &AppState, account_id: Uuid, difficulty: &str) -> ArcadeResult<Option<i64>> {
    state.db.user_best_rank(&account_id.to_string(), difficulty).await
}
