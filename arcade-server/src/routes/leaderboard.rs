use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthedAccount;
use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::service::leaderboard;
use crate::state::AppState;

/// GET /api/leaderboard is public; when a valid bearer token happens to be
/// present the response additionally carries the caller's own rank.
fn try_authed_account_id(state: &AppState, headers: &HeaderMap) -> Option<Uuid> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let claims = state.tokenizer.verify(token).ok()?;
    Uuid::parse_str(&claims.sub).ok()
}

pub async fn start_session(State(state): State<AppState>, auth: AuthedAccount) -> Response {
    let (token, hmac_key) = state.run_sessions.start_leaderboard_session(&auth.account_id.to_string()).await;
    Json(json!({ "gameSessionToken": token, "hmacKey": hmac_key })).into_response()
}

#[derive(Deserialize)]
pub struct SubmitBody {
    #[serde(flatten)]
    submission: arcade_core::domain::LeaderboardSubmission,
    #[serde(rename = "gameSessionToken")]
    game_session_token: String,
    checksum: String,
}

/// Submission is silently gated at the auth layer: an unauthenticated
/// caller never reaches this handler (the route requires `AuthedAccount`),
/// matching the "client gets a degraded end-of-run screen rather than an
/// error" contract — the axum router maps missing/invalid bearer tokens
/// to a plain 401 here rather than a bespoke null body, since this is a
/// server API rather than the browser client itself.
pub async fn submit(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    auth: AuthedAccount,
    Json(body): Json<SubmitBody>,
) -> Result<Response, ApiError> {
    let outcome = leaderboard::submit(
        &state,
        auth.account_id,
        &auth.display_name,
        body.submission,
        &body.game_session_token,
        &body.checksum,
    )
    .await
    .map_err(|e| ApiError::new(e, rid.0))?;

    Ok(Json(json!({ "entry": outcome.entry, "rank": outcome.rank })).into_response())
}

#[derive(Deserialize)]
pub struct ListQuery {
    difficulty: String,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list(
    State(state): State<AppState>,
    Extension(rid): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let entries = leaderboard::top_n(&state, &query.difficulty, query.limit)
        .await
        .map_err(|e| ApiError::new(e, rid.0))?;
    let total = state.db.count_in_difficulty(&query.difficulty).await.map_err(|e| ApiError::new(e, rid.0))?;

    let user_rank = match try_authed_account_id(&state, &headers) {
        Some(account_id) => leaderboard::user_best_rank(&state, account_id, &query.difficulty)
            .await
            .map_err(|e| ApiError::new(e, rid.0))?,
        None => None,
    };

    let rendered: Vec<_> = entries
        .iter()
        .map(|e| {
            json!({
                "accountId": e.row.account_id,
                "displayName": e.row.display_name,
                "score": e.row.score,
                "wave": e.row.wave,
                "kills": e.row.kills,
                "rank": e.rank,
            })
        })
        .collect();

    Ok(Json(json!({ "entries": rendered, "total": total, "userRank": user_rank })).into_response())
}
