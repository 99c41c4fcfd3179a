use arcade_core::domain::{Account, Provider, VerificationState};
use arcade_core::error::{ArcadeError, ArcadeResult};
use arcade_crypto::{generate_numeric_code, generate_opaque_token, hash_password, verify_password};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::state::AppState;

const CODE_TTL_MINUTES: i64 = 15;
const MAX_CODE_ATTEMPTS: i64 = 5;
const REFRESH_TTL_WEEKS: i64 = 2;
const RATE_WINDOW_SECS: i64 = 60;
const RATE_LIMIT_PER_WINDOW: i64 = 5;

fn to_account(row: arcade_db::AccountRow) -> ArcadeResult<Account> {
    Ok(Account {
        id: Uuid::parse_str(&row.id).map_err(|_| ArcadeError::Internal("bad account id".into()))?,
        email: row.email,
        display_name: row.display_name,
        provider: match row.provider.as_str() {
            "email" => Provider::Email,
            "federated" => Provider::Federated,
            _ => Provider::Anonymous,
        },
        verification: match row.verification.as_str() {
            "verified" => VerificationState::Verified,
            _ => VerificationState::Pending,
        },
        created_at: row.created_at,
    })
}

pub async fn register_email(
    state: &AppState,
    ip: &str,
    email: &str,
    password: &str,
    display_name: &str,
) -> ArcadeResult<Uuid> {
    state
        .db
        .check_and_increment(&format!("ip:{ip}"), "register", RATE_WINDOW_SECS, RATE_LIMIT_PER_WINDOW)
        .await?;

    if let Some(existing) = state.db.find_account_by_email(email).await? {
        if existing.verification == "verified" {
            return Err(ArcadeError::EmailInUse);
        }
    }

    let account_id = Uuid::new_v4();
    let hash = hash_password(password).map_err(|e| ArcadeError::Internal(e.to_string()))?;

    if state.db.find_account_by_email(email).await?.is_none() {
        state
            .db
            .insert_account(
                &account_id.to_string(),
                Some(email),
                display_name,
                Some(&hash),
                "email",
                "pending",
                Utc::now(),
            )
            .await?;
        state
            .db
            .seed_starter_credits(&account_id.to_string(), state.starter_free_credits())
            .await?;
    }

    let code = generate_numeric_code();
    let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
    state
        .db
        .upsert_verification_code(email, "register", &code, Some(&account_id.to_string()), expires_at)
        .await?;
    state.mail.send_verification_code(email, &code).await;

    Ok(account_id)
}

pub async fn verify_registration(state: &AppState, email: &str, code: &str) -> ArcadeResult<Account> {
    let row = state
        .db
        .get_verification_code(email, "register")
        .await?
        .ok_or(ArcadeError::BadCode)?;

    if Utc::now() > row.expires_at {
        state.db.delete_verification_code(email, "register").await?;
        return Err(ArcadeError::BadCode);
    }
    if row.attempts >= MAX_CODE_ATTEMPTS {
        return Err(ArcadeError::TooManyAttempts);
    }
    if row.code != code {
        state.db.increment_code_attempts(email, "register").await?;
        return Err(ArcadeError::BadCode);
    }

    let account_id = row.account_id.ok_or_else(|| ArcadeError::Internal("code missing account".into()))?;
    state.db.mark_verified(&account_id).await?;
    state.db.delete_verification_code(email, "register").await?;

    let account_row = state
        .db
        .find_account_by_id(&account_id)
        .await?
        .ok_or(ArcadeError::NotFound)?;
    to_account(account_row)
}

pub async fn login_email(
    state: &AppState,
    ip: &str,
    email: &str,
    password: &str,
) -> ArcadeResult<(Account, String)> {
    state
        .db
        .check_and_increment(&format!("ip:{ip}"), "login", RATE_WINDOW_SECS, RATE_LIMIT_PER_WINDOW)
        .await?;
    state
        .db
        .check_and_increment(&format!("email:{email}"), "login", RATE_WINDOW_SECS, RATE_LIMIT_PER_WINDOW)
        .await?;

    let row = state.db.find_account_by_email(email).await?.ok_or(ArcadeError::InvalidCredentials)?;
    let Some(stored_hash) = row.password_hash.clone() else {
        return Err(ArcadeError::InvalidCredentials);
    };

    // Password is always checked, even when the account is unverified, so
    // the outward error for wrong-password and wrong-email stay
    // indistinguishable.
    if !verify_password(password, &stored_hash) {
        return Err(ArcadeError::InvalidCredentials);
    }
    if row.verification != "verified" {
        return Err(ArcadeError::NotVerified);
    }

    let refresh_token = issue_refresh_session(state, &row.id).await?;
    let account = to_account(row)?;
    Ok((account, refresh_token))
}

pub async fn login_anonymous(state: &AppState, display_name: &str) -> ArcadeResult<(Account, String)> {
    let account_id = Uuid::new_v4();
    state
        .db
        .insert_account(&account_id.to_string(), None, display_name, None, "anonymous", "verified", Utc::now())
        .await?;
    state
        .db
        .seed_starter_credits(&account_id.to_string(), state.starter_free_credits())
        .await?;

    let refresh_token = issue_refresh_session(state, &account_id.to_string()).await?;
    let row = state
        .db
        .find_account_by_id(&account_id.to_string())
        .await?
        .ok_or(ArcadeError::Internal("account vanished after insert".into()))?;
    Ok((to_account(row)?, refresh_token))
}

async fn issue_refresh_session(state: &AppState, account_id: &str) -> ArcadeResult<String> {
    let token = generate_opaque_token();
    let expires_at = Utc::now() + Duration::weeks(REFRESH_TTL_WEEKS);
    state.db.insert_refresh_session(&token, account_id, expires_at).await?;
    Ok(token)
}

/// Rotates the refresh token on every use. Presenting an already-revoked
/// token is treated as a credential-compromise signal: the whole session
/// family for that account is revoked, forcing re-authentication.
pub async fn refresh_tokens(state: &AppState, refresh_token: &str) -> ArcadeResult<(Account, String)> {
    let (account_id, expires_at, revoked) = state
        .db
        .get_refresh_session(refresh_token)
        .await?
        .ok_or(ArcadeError::InvalidCredentials)?;

    if revoked {
        state.db.revoke_all_refresh_sessions_for_account(&account_id).await?;
        return Err(ArcadeError::InvalidCredentials);
    }
    if Utc::now() > expires_at {
        return Err(ArcadeError::InvalidCredentials);
    }

    state.db.revoke_refresh_session(refresh_token).await?;
    let new_token = issue_refresh_session(state, &account_id).await?;
    let row = state.db.find_account_by_id(&account_id).await?.ok_or(ArcadeError::NotFound)?;
    Ok((to_account(row)?, new_token))
}

/// The response is identical whether or not the email is registered; only
/// an actual email delivery (out of band) distinguishes the two cases.
pub async fn begin_password_reset(state: &AppState, email: &str) {
    if let Ok(Some(row)) = state.db.find_account_by_email(email).await {
        if row.provider == "email" {
            let code = generate_numeric_code();
            let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
            let _ = state
                .db
                .upsert_verification_code(email, "reset", &code, Some(&row.id), expires_at)
                .await;
            state.mail.send_reset_code(email, &code).await;
        }
    }
}

pub async fn complete_password_reset(
    state: &AppState,
    email: &str,
    code: &str,
    new_password: &str,
) -> ArcadeResult<()> {
    let row = state
        .db
        .get_verification_code(email, "reset")
        .await?
        .ok_or(ArcadeError::BadCode)?;

    if Utc::now() > row.expires_at {
        state.db.delete_verification_code(email, "reset").await?;
        return Err(ArcadeError::BadCode);
    }
    if row.attempts >= MAX_CODE_ATTEMPTS {
        return Err(ArcadeError::TooManyAttempts);
    }
    if row.code != code {
        state.db.increment_code_attempts(email, "reset").await?;
        return Err(ArcadeError::BadCode);
    }

    let account_id = row.account_id.ok_or_else(|| ArcadeError::Internal("code missing account".into()))?;
    let hash = hash_password(new_password).map_err(|e| ArcadeError::Internal(e.to_string()))?;
    state.db.update_password_hash(&account_id, &hash).await?;
    state.db.delete_verification_code(email, "reset").await?;
    state.db.revoke_all_refresh_sessions_for_account(&account_id).await?;
    Ok(())
}
