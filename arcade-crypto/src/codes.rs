use rand::Rng;

/// Generate a 6-digit numeric code for email verification / password reset.
pub fn generate_numeric_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Generate a high-entropy opaque string suitable for a refresh token or a
/// run-scoped session nonce.
pub fn generate_opaque_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_code_is_always_six_digits() {
        for _ in 0..50 {
            let code = generate_numeric_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn opaque_tokens_are_unique() {
        let a = generate_opaque_token();
        let b = generate_opaque_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
