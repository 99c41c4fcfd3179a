use arcade_core::domain::Save;
use arcade_core::error::{ArcadeError, ArcadeResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::state::AppState;

fn row_to_save(account_id: Uuid, row: arcade_db::SaveRow) -> ArcadeResult<Save> {
    let save_data: serde_json::Value =
        serde_json::from_str(&row.save_data).map_err(|e| ArcadeError::Internal(e.to_string()))?;
    Ok(Save {
        account_id,
        schema_version: row.schema_version,
        save_data,
        wave: row.wave,
        game_state: row.game_state,
        fingerprint: row.fingerprint,
        updated_at: row.updated_at,
    })
}

pub async fn write_save(
    state: &AppState,
    account_id: Uuid,
    save_session_token: &str,
    save_data: &serde_json::Value,
    wave: i64,
    game_state: &str,
    schema_version: i64,
    expected_fingerprint: Option<&str>,
) -> ArcadeResult<String> {
    state
        .run_sessions
        .verify_save_session(save_session_token, &account_id.to_string())?;

    let serialized = serde_json::to_string(save_data).map_err(|e| ArcadeError::Internal(e.to_string()))?;
    state
        .db
        .write_save(
            &account_id.to_string(),
            schema_version,
            &serialized,
            wave,
            game_state,
            expected_fingerprint,
        )
        .await
}

pub async fn read_save(state: &AppState, account_id: Uuid) -> ArcadeResult<Save> {
    let row = state
        .db
        .read_save(&account_id.to_string())
        .await?
        .ok_or(ArcadeError::NotFound)?;
    row_to_save(account_id, row)
}

pub async fn delete_save(state: &AppState, account_id: Uuid) -> ArcadeResult<()> {
    state.db.delete_save(&account_id.to_string()).await
}

#[allow(dead_code)]
pub async fn last_updated(state: &AppState, account_id: Uuid) -> ArcadeResult<DateTime<Utc>> {
    let row = state
        .db
        .read_save(&account_id.to_string())
        .await?
        .ok_or(ArcadeError::NotFound)?;
    Ok(row.updated_at)
}
