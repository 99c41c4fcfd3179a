use arcade_core::domain::{CreditBalance, Save};
use arcade_core::error::{ArcadeError, ArcadeResult};
use arcade_crypto::{generate_opaque_token, HmacPurpose};
use chrono::{Duration, Utc};
use hmac::Mac;
use sha2::Sha256;
use uuid::Uuid;

use crate::state::AppState;

const CONTINUE_TTL_MINUTES: i64 = 5;

type HmacSha256 = hmac::Hmac<Sha256>;

fn to_balance(b: arcade_db::Balance) -> CreditBalance {
    CreditBalance {
        free_remaining: b.free_remaining,
        purchased: b.purchased,
    }
}

pub async fn get_balance(state: &AppState, account_id: Uuid) -> ArcadeResult<CreditBalance> {
    Ok(to_balance(state.db.get_balance(&account_id.to_string()).await?))
}

pub async fn begin_checkout(
    state: &AppState,
    account_id: Uuid,
    success_url: &str,
    cancel_url: &str,
) -> ArcadeResult<String> {
    state
        .checkout
        .create_checkout_session(&account_id.to_string(), &state.config.payment_price_id, success_url, cancel_url)
        .await
        .map_err(|e| ArcadeError::Internal(e.to_string()))
}

pub async fn handle_webhook(state: &AppState, raw_body: &[u8], signature_header: &str) -> ArcadeResult<()> {
    let mut mac = HmacSha256::new_from_slice(state.config.payment_webhook_secret.as_bytes())
        .map_err(|e| ArcadeError::Internal(e.to_string()))?;
    mac.update(raw_body);
    let expected = hex::decode(signature_header).map_err(|_| ArcadeError::BadSignature)?;
    mac.verify_slice(&expected).map_err(|_| ArcadeError::BadSignature)?;

    let event: serde_json::Value =
        serde_json::from_slice(raw_body).map_err(|_| ArcadeError::InputShape("malformed webhook body".into()))?;

    let Some(event_type) = event.get("type").and_then(|v| v.as_str()) else {
        return Ok(());
    };
    if event_type != "payment.succeeded" {
        return Ok(());
    }

    let account_id = event
        .get("accountId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ArcadeError::InputShape("webhook missing accountId".into()))?;
    let credits = event
        .get("credits")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ArcadeError::InputShape("webhook missing credits".into()))?;
    let event_id = event
        .get("eventId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ArcadeError::InputShape("webhook missing eventId".into()))?;

    state.db.grant_purchased(account_id, credits, event_id).await?;
    Ok(())
}

/// Atomically decrements a credit and mints a one-shot continue token bound
/// to the save's current fingerprint. The credit is not spent if no save
/// exists to continue.
pub async fn request_continue(
    state: &AppState,
    account_id: Uuid,
) -> ArcadeResult<(String, Save, CreditBalance)> {
    let save_row = state
        .db
        .read_save(&account_id.to_string())
        .await?
        .ok_or(ArcadeError::NotFound)?;

    let new_balance = state.db.spend_one(&account_id.to_string()).await?;

    let nonce = generate_opaque_token();
    let issued_at = Utc::now();
    state
        .db
        .record_continue_issued(&nonce, &account_id.to_string(), &save_row.fingerprint, issued_at)
        .await?;

    let payload = format!("{}:{}:{}", account_id, nonce, issued_at.timestamp());
    let signature = state.signer.sign(HmacPurpose::Continue, payload.as_bytes());
    let token = format!("{payload}.{signature}");

    let save_data: serde_json::Value =
        serde_json::from_str(&save_row.save_data).map_err(|e| ArcadeError::Internal(e.to_string()))?;
    let save = Save {
        account_id,
        schema_version: save_row.schema_version,
        save_data,
        wave: save_row.wave,
        game_state: save_row.game_state,
        fingerprint: save_row.fingerprint,
        updated_at: save_row.updated_at,
    };

    Ok((token, save, to_balance(new_balance)))
}

/// Verifies and consumes a continue token. The save itself is left intact
/// so a second death at the same checkpoint can spend another credit.
pub async fn redeem_continue(state: &AppState, account_id: Uuid, continue_token: &str) -> ArcadeResult<()> {
    let (payload, signature) = continue_token.rsplit_once('.').ok_or(ArcadeError::BadSession)?;
    state
        .signer
        .verify(HmacPurpose::Continue, payload.as_bytes(), signature)
        .map_err(|_| ArcadeError::BadSession)?;

    let mut parts = payload.splitn(3, ':');
    let token_account = parts.next().ok_or(ArcadeError::BadSession)?;
    let nonce = parts.next().ok_or(ArcadeError::BadSession)?;
    let issued_at: i64 = parts
        .next()
        .ok_or(ArcadeError::BadSession)?
        .parse()
        .map_err(|_| ArcadeError::BadSession)?;

    if token_account != account_id.to_string() {
        return Err(ArcadeError::BadSession);
    }
    if Utc::now().timestamp() - issued_at > Duration::minutes(CONTINUE_TTL_MINUTES).num_seconds() {
        return Err(ArcadeError::BadSession);
    }

    let current_fingerprint = state
        .db
        .get_fingerprint(&account_id.to_string())
        .await?
        .ok_or(ArcadeError::NotFound)?;

    state
        .db
        .consume_continue(nonce, &account_id.to_string(), &current_fingerprint)
        .await
}
