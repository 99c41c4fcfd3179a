use std::collections::HashMap;
use std::sync::Arc;

use arcade_core::error::{ArcadeError, ArcadeResult};
use arcade_crypto::{generate_opaque_token, HmacPurpose, HmacSigner};
use base64::Engine;
use chrono::Utc;
use tokio::sync::Mutex;

const SAVE_SESSION_TTL_SECS: i64 = 6 * 3600;
const LEADERBOARD_SESSION_TTL_SECS: i64 = 2 * 3600;

fn b64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn b64_decode(data: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::STANDARD.decode(data).ok()
}

/// Per-run session tokens. Save-session tokens are self-contained
/// HMAC-signed values verified statelessly; leaderboard-session tokens are
/// opaque and looked up in an in-process keyed store so the per-run HMAC
/// key they hand out can be revoked exactly once, on first submission.
/// Neither kind is ever written to the database: a client reload loses its
/// in-memory copy and the run ends as far as the backend is concerned.
pub struct RunSessionGate {
    signer: Arc<HmacSigner>,
    leaderboard_sessions: Mutex<HashMap<String, LeaderboardSessionRecord>>,
}

struct LeaderboardSessionRecord {
    account_id: String,
    hmac_key: String,
}

impl RunSessionGate {
    pub fn new(signer: Arc<HmacSigner>) -> Self {
        Self {
            signer,
            leaderboard_sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn start_save_session(&self, account_id: &str) -> String {
        let nonce = generate_opaque_token();
        let issued_at = Utc::now().timestamp();
        let payload = format!("{account_id}:{nonce}:{issued_at}");
        let sig = self.signer.sign(HmacPurpose::SaveSession, payload.as_bytes());
        format!("{}.{}", b64_encode(payload.as_bytes()), sig)
    }

    pub fn verify_save_session(&self, token: &str, account_id: &str) -> ArcadeResult<()> {
        let (payload_account, issued_at) = self.verify_token(token, HmacPurpose::SaveSession)?;
        if payload_account != account_id {
            return Err(ArcadeError::BadSession);
        }
        if Utc::now().timestamp() - issued_at > SAVE_SESSION_TTL_SECS {
            return Err(ArcadeError::BadSession);
        }
        Ok(())
    }

    pub async fn start_leaderboard_session(&self, account_id: &str) -> (String, String) {
        let nonce = generate_opaque_token();
        let issued_at = Utc::now().timestamp();
        let payload = format!("{account_id}:{nonce}:{issued_at}");
        let sig = self.signer.sign(HmacPurpose::LeaderboardSession, payload.as_bytes());
        let token = format!("{}.{}", b64_encode(payload.as_bytes()), sig);
        let hmac_key = generate_opaque_token();

        self.leaderboard_sessions.lock().await.insert(
            token.clone(),
            LeaderboardSessionRecord {
                account_id: account_id.to_string(),
                hmac_key: hmac_key.clone(),
            },
        );

        (token, hmac_key)
    }

    /// One-shot: removes the record on success so a session token can back
    /// exactly one submission.
    pub async fn consume_leaderboard_session(&self, token: &str, account_id: &str) -> ArcadeResult<String> {
        let (payload_account, issued_at) = self.verify_token(token, HmacPurpose::LeaderboardSession)?;
        if payload_account != account_id {
            return Err(ArcadeError::BadSession);
        }
        if Utc::now().timestamp() - issued_at > LEADERBOARD_SESSION_TTL_SECS {
            return Err(ArcadeError::BadSession);
        }

        let mut sessions = self.leaderboard_sessions.lock().await;
        let record = sessions.remove(token).ok_or(ArcadeError::BadSession)?;
        if record.account_id != account_id {
            return Err(ArcadeError::BadSession);
        }
        Ok(record.hmac_key)
    }

    fn verify_token(&self, token: &str, purpose: HmacPurpose) -> ArcadeResult<(String, i64)> {
        let (payload_b64, sig) = token.split_once('.').ok_or(ArcadeError::BadSession)?;
        let payload_bytes = b64_decode(payload_b64).ok_or(ArcadeError::BadSession)?;
        self.signer
            .verify(purpose, &payload_bytes, sig)
            .map_err(|_| ArcadeError::BadSession)?;

        let payload = String::from_utf8(payload_bytes).map_err(|_| ArcadeError::BadSession)?;
        let mut parts = payload.splitn(3, ':');
        let account_id = parts.next().ok_or(ArcadeError::BadSession)?.to_string();
        let _nonce = parts.next().ok_or(ArcadeError::BadSession)?;
        let issued_at: i64 = parts
            .next()
            .ok_or(ArcadeError::BadSession)?
            .parse()
            .map_err(|_| ArcadeError::BadSession)?;

        Ok((account_id, issued_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> RunSessionGate {
        RunSessionGate::new(Arc::new(HmacSigner::new(
            b"save-secret".to_vec(),
            b"leaderboard-secret".to_vec(),
            b"continue-secret".to_vec(),
        )))
    }

    #[test]
    fn save_session_round_trips() {
        let gate = gate();
        let token = gate.start_save_session("acct-1");
        assert!(gate.verify_save_session(&token, "acct-1").is_ok());
        assert!(gate.verify_save_session(&token, "acct-2").is_err());
    }

    #[tokio::test]
    async fn leaderboard_session_is_one_shot() {
        let gate = gate();
        let (token, key) = gate.start_leaderboard_session("acct-1").await;
        let consumed = gate.consume_leaderboard_session(&token, "acct-1").await.unwrap();
        assert_eq!(consumed, key);
        assert!(gate.consume_leaderboard_session(&token, "acct-1").await.is_err());
    }
}
