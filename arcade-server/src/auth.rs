use arcade_core::error::ArcadeError;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use crate::request_id::RequestId;
use crate::state::AppState;

/// Extractor for the authenticated caller, pulled from the `Authorization:
/// Bearer` header. Routes that take this extractor are implicitly
/// authenticated; public routes simply don't take it.
pub struct AuthedAccount {
    pub account_id: Uuid,
    pub display_name: String,
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthedAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let correlation_id = parts
            .extensions
            .get::<RequestId>()
            .map(|r| r.0)
            .unwrap_or_else(Uuid::new_v4);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::new(ArcadeError::Unauthenticated, correlation_id))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::new(ArcadeError::Unauthenticated, correlation_id))?;

        let claims = app_state
            .tokenizer
            .verify(token)
            .map_err(|_| ApiError::new(ArcadeError::Unauthenticated, correlation_id))?;

        let account_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::new(ArcadeError::Unauthenticated, correlation_id))?;

        Ok(AuthedAccount {
            account_id,
            display_name: claims.display_name,
        })
    }
}
