use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthedAccount;
use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::service::progression;
use crate::state::AppState;

pub async fn get_progression(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    let meta = progression::load_meta(&state, auth.account_id).await.map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "data": meta.data, "schemaVersion": meta.schema_version })).into_response())
}

#[derive(Deserialize)]
pub struct PutProgressionBody {
    data: serde_json::Value,
    #[serde(rename = "schemaVersion")]
    schema_version: i64,
}

pub async fn put_progression(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Json(body): Json<PutProgressionBody>,
) -> Result<Response, ApiError> {
    progression::store_meta(&state, auth.account_id, &body.data, body.schema_version)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}

pub async fn get_achievements(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    let achievements = progression::load_achievements(&state, auth.account_id)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "achievements": achievements })).into_response())
}

pub async fn unlock_achievement(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Path(achievement_id): Path<String>,
) -> Result<Response, ApiError> {
    progression::unlock_achievement(&state, auth.account_id, &achievement_id)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}
