use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthedAccount;
use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::service::credits;
use crate::state::AppState;

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    let balance = credits::get_balance(&state, auth.account_id).await.map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "credits": {
        "freeRemaining": balance.free_remaining,
        "purchased": balance.purchased,
        "total": balance.total(),
    }}))
    .into_response())
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    #[serde(rename = "successUrl")]
    success_url: String,
    #[serde(rename = "cancelUrl")]
    cancel_url: String,
}

pub async fn checkout(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Json(body): Json<CheckoutBody>,
) -> Result<Response, ApiError> {
    let url = credits::begin_checkout(&state, auth.account_id, &body.success_url, &body.cancel_url)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "url": url })).into_response())
}

pub async fn continue_run(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
) -> Result<Response, ApiError> {
    let (token, save, balance) = credits::request_continue(&state, auth.account_id)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({
        "continueToken": token,
        "save": save,
        "creditBalance": {
            "freeRemaining": balance.free_remaining,
            "purchased": balance.purchased,
            "total": balance.total(),
        },
    }))
    .into_response())
}

#[derive(Deserialize)]
pub struct RedeemBody {
    #[serde(rename = "continueToken")]
    continue_token: String,
}

pub async fn redeem(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Json(body): Json<RedeemBody>,
) -> Result<Response, ApiError> {
    credits::redeem_continue(&state, auth.account_id, &body.continue_token)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}

pub async fn webhook(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::new(arcade_core::error::ArcadeError::BadSignature, rid.0))?;

    credits::handle_webhook(&state, &body, signature).await.map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}
