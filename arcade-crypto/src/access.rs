use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub display_name: String,
    pub provider: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct AccessTokenizer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl AccessTokenizer {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn mint(&self, account_id: &str, display_name: &str, provider: &str) -> CryptoResult<(String, i64)> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account_id.to_string(),
            display_name: display_name.to_string(),
            provider: provider.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| CryptoError::Malformed)?;
        Ok((token, self.ttl_secs))
    }

    pub fn verify(&self, token: &str) -> CryptoResult<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => CryptoError::Expired,
                _ => CryptoError::Malformed,
            })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_and_verifies_a_token() {
        let tz = AccessTokenizer::new(b"test-secret-value-long-enough", 900);
        let (token, ttl) = tz.mint("acct-1", "Alice", "email").unwrap();
        assert_eq!(ttl, 900);
        let claims = tz.verify(&token).unwrap();
        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.display_name, "Alice");
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let tz1 = AccessTokenizer::new(b"secret-one-long-enough-value", 900);
        let tz2 = AccessTokenizer::new(b"secret-two-long-enough-value", 900);
        let (token, _) = tz1.mint("acct-1", "Alice", "email").unwrap();
        assert!(tz2.verify(&token).is_err());
    }
}
