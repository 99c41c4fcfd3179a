use arcade_core::domain::{Achievement, MetaProgression};
use arcade_core::error::{ArcadeError, ArcadeResult};
use uuid::Uuid;

use crate::state::AppState;

pub async fn load_meta(state: &AppState, account_id: Uuid) -> ArcadeResult<MetaProgression> {
    match state.db.load_meta(&account_id.to_string()).await? {
        Some((data, schema_version)) => Ok(MetaProgression {
            data: serde_json::from_str(&data).map_err(|e| ArcadeError::Internal(e.to_string()))?,
            schema_version,
        }),
        None => Ok(MetaProgression {
            data: serde_json::json!({}),
            schema_version: 1,
        }),
    }
}

pub async fn store_meta(
    state: &AppState,
    account_id: Uuid,
    data: &serde_json::Value,
    schema_version: i64,
) -> ArcadeResult<()> {
    let serialized = serde_json::to_string(data).map_err(|e| ArcadeError::Internal(e.to_string()))?;
    state.db.store_meta(&account_id.to_string(), &serialized, schema_version).await
}

pub async fn load_achievements(state: &AppState, account_id: Uuid) -> ArcadeResult<Vec<Achievement>> {
    let rows = state.db.load_achievements(&account_id.to_string()).await?;
    Ok(rows
        .into_iter()
        .map(|(achievement_id, unlocked_at)| Achievement {
            achievement_id,
            unlocked_at,
        })
        .collect())
}

pub async fn unlock_achievement(state: &AppState, account_id: Uuid, achievement_id: &str) -> ArcadeResult<()> {
    state.db.unlock_achievement(&account_id.to_string(), achievement_id).await
}
