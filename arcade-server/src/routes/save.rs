use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthedAccount;
use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::service::save;
use crate::state::AppState;

pub async fn start_session(
    State(state): State<AppState>,
    auth: AuthedAccount,
) -> Response {
    let token = state.run_sessions.start_save_session(&auth.account_id.to_string());
    Json(json!({ "token": token })).into_response()
}

pub async fn get_save(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    let result = save::read_save(&state, auth.account_id).await.map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "save": result })).into_response())
}

#[derive(Deserialize)]
pub struct PutSaveBody {
    #[serde(rename = "sessionToken")]
    session_token: String,
    #[serde(rename = "saveData")]
    save_data: serde_json::Value,
    wave: i64,
    #[serde(rename = "gameState")]
    game_state: String,
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    schema_version: i64,
    #[serde(rename = "expectedFingerprint")]
    expected_fingerprint: Option<String>,
}

fn default_schema_version() -> i64 {
    1
}

pub async fn put_save(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Json(body): Json<PutSaveBody>,
) -> Result<Response, ApiError> {
    let fingerprint = save::write_save(
        &state,
        auth.account_id,
        &body.session_token,
        &body.save_data,
        body.wave,
        &body.game_state,
        body.schema_version,
        body.expected_fingerprint.as_deref(),
    )
    .await
    .map_err(|e| ApiError::new(e, rid.0))?;

    Ok(Json(json!({ "ok": true, "fingerprint": fingerprint })).into_response())
}

pub async fn delete_save(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    save::delete_save(&state, auth.account_id).await.map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}
