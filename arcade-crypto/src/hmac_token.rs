use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Selects which of the three independent secrets signs a run-scoped token.
/// The purposes must never share a secret: compromising one token class
/// must not let an attacker forge another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacPurpose {
    SaveSession,
    LeaderboardSession,
    Continue,
}

pub struct HmacSigner {
    save_session_secret: Vec<u8>,
    leaderboard_session_secret: Vec<u8>,
    continue_secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(
        save_session_secret: Vec<u8>,
        leaderboard_session_secret: Vec<u8>,
        continue_secret: Vec<u8>,
    ) -> Self {
        Self {
            save_session_secret,
            leaderboard_session_secret,
            continue_secret,
        }
    }

    fn secret_for(&self, purpose: HmacPurpose) -> &[u8] {
        match purpose {
            HmacPurpose::SaveSession => &self.save_session_secret,
            HmacPurpose::LeaderboardSession => &self.leaderboard_session_secret,
            HmacPurpose::Continue => &self.continue_secret,
        }
    }

    /// Produce a lower-hex HMAC-SHA256 signature of `payload` under the
    /// secret for `purpose`.
    pub fn sign(&self, purpose: HmacPurpose, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_for(purpose))
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify `signature_hex` against `payload` under the secret for
    /// `purpose`. Comparison is constant-time (delegated to the `hmac`
    /// crate's own `verify_slice`).
    pub fn verify(&self, purpose: HmacPurpose, payload: &[u8], signature_hex: &str) -> CryptoResult<()> {
        let expected = match hex::decode(signature_hex) {
            Ok(bytes) => bytes,
            Err(_) => return Err(CryptoError::Malformed),
        };
        let mut mac = HmacSha256::new_from_slice(self.secret_for(purpose))
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac.verify_slice(&expected).map_err(|_| CryptoError::Malformed)
    }

    /// Sign arbitrary keyed payload with an externally supplied per-run key
    /// (used for leaderboard submissions, whose key is minted per run
    /// rather than drawn from one of the three static secrets).
    pub fn sign_with_key(key_hex: &str, payload: &[u8]) -> CryptoResult<String> {
        let key = hex::decode(key_hex).map_err(|_| CryptoError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| CryptoError::Malformed)?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify_with_key(key_hex: &str, payload: &[u8], signature_hex: &str) -> CryptoResult<()> {
        let key = hex::decode(key_hex).map_err(|_| CryptoError::Malformed)?;
        let expected = hex::decode(signature_hex).map_err(|_| CryptoError::Malformed)?;
        let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| CryptoError::Malformed)?;
        mac.update(payload);
        mac.verify_slice(&expected).map_err(|_| CryptoError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> HmacSigner {
        HmacSigner::new(
            b"save-secret".to_vec(),
            b"leaderboard-secret".to_vec(),
            b"continue-secret".to_vec(),
        )
    }

    #[test]
    fn round_trips_a_signature() {
        let s = signer();
        let sig = s.sign(HmacPurpose::SaveSession, b"payload");
        assert!(s.verify(HmacPurpose::SaveSession, b"payload", &sig).is_ok());
    }

    #[test]
    fn rejects_cross_purpose_signatures() {
        let s = signer();
        let sig = s.sign(HmacPurpose::SaveSession, b"payload");
        assert!(s
            .verify(HmacPurpose::LeaderboardSession, b"payload", &sig)
            .is_err());
    }

    #[test]
    fn rejects_mutated_payload() {
        let s = signer();
        let sig = s.sign(HmacPurpose::Continue, b"payload");
        assert!(s.verify(HmacPurpose::Continue, b"payload-mutated", &sig).is_err());
    }

    #[test]
    fn per_run_key_signing_round_trips() {
        let key = hex::encode(b"a-per-run-hmac-key-value");
        let sig = HmacSigner::sign_with_key(&key, b"canonical-payload").unwrap();
        assert!(HmacSigner::verify_with_key(&key, b"canonical-payload", &sig).is_ok());
        assert!(HmacSigner::verify_with_key(&key, b"other-payload", &sig).is_err());
    }
}
