use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::cookies::{read_refresh_cookie, set_refresh_cookie};
use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::service::identity;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterBody {
    email: String,
    password: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(rid): Extension<RequestId>,
    Json(body): Json<RegisterBody>,
) -> Result<Response, ApiError> {
    let account_id = identity::register_email(&state, &addr.ip().to_string(), &body.email, &body.password, &body.display_name)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;

    Ok(Json(json!({ "accountId": account_id, "status": "code-sent" })).into_response())
}

#[derive(Deserialize)]
pub struct VerifyRegistrationBody {
    email: String,
    code: String,
}

pub async fn verify_registration(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(body): Json<VerifyRegistrationBody>,
) -> Result<Response, ApiError> {
    let account = identity::verify_registration(&state, &body.email, &body.code)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;

    let (access_token, expires_in) = state
        .tokenizer
        .mint(&account.id.to_string(), &account.display_name, "email")
        .map_err(|_| ApiError::new(arcade_core::error::ArcadeError::Internal("token mint failed".into()), rid.0))?;

    Ok(Json(json!({
        "accessToken": access_token,
        "expiresIn": expires_in,
        "user": account,
    }))
    .into_response())
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum LoginBody {
    Email { email: String, password: String },
    Anonymous {
        #[serde(rename = "displayName")]
        display_name: String,
    },
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(rid): Extension<RequestId>,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    let (account, refresh_token, provider) = match body {
        LoginBody::Email { email, password } => {
            let (account, refresh_token) = identity::login_email(&state, &addr.ip().to_string(), &email, &password)
                .await
                .map_err(|e| ApiError::new(e, rid.0))?;
            (account, refresh_token, "email")
        }
        LoginBody::Anonymous { display_name } => {
            let (account, refresh_token) = identity::login_anonymous(&state, &display_name)
                .await
                .map_err(|e| ApiError::new(e, rid.0))?;
            (account, refresh_token, "anonymous")
        }
    };

    let (access_token, expires_in) = state
        .tokenizer
        .mint(&account.id.to_string(), &account.display_name, provider)
        .map_err(|_| ApiError::new(arcade_core::error::ArcadeError::Internal("token mint failed".into()), rid.0))?;

    let mut response = Json(json!({
        "accessToken": access_token,
        "expiresIn": expires_in,
        "user": account,
    }))
    .into_response();
    set_refresh_cookie(response.headers_mut(), &refresh_token);
    Ok(response)
}

pub async fn refresh(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let refresh_token = read_refresh_cookie(&headers)
        .ok_or_else(|| ApiError::new(arcade_core::error::ArcadeError::Unauthenticated, rid.0))?;

    let (account, new_refresh_token) = identity::refresh_tokens(&state, &refresh_token)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;

    let (access_token, expires_in) = state
        .tokenizer
        .mint(&account.id.to_string(), &account.display_name, "email")
        .map_err(|_| ApiError::new(arcade_core::error::ArcadeError::Internal("token mint failed".into()), rid.0))?;

    let mut response = Json(json!({
        "accessToken": access_token,
        "expiresIn": expires_in,
        "user": account,
    }))
    .into_response();
    set_refresh_cookie(response.headers_mut(), &new_refresh_token);
    Ok(response)
}

#[derive(Deserialize)]
pub struct ForgotPasswordBody {
    email: String,
}

pub async fn forgot_password(State(state): State<AppState>, Json(body): Json<ForgotPasswordBody>) -> Response {
    identity::begin_password_reset(&state, &body.email).await;
    Json(json!({ "ok": true })).into_response()
}

#[derive(Deserialize)]
pub struct ResetPasswordBody {
    email: String,
    code: String,
    #[serde(rename = "newPassword")]
    new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Response, ApiError> {
    identity::complete_password_reset(&state, &body.email, &body.code, &body.new_password)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    Ok(Json(json!({ "ok": true })).into_response())
}
