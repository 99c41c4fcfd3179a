use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("signing key missing or placeholder in production")]
    KeyMisconfigured,

    #[error("token expired")]
    Expired,

    #[error("token malformed")]
    Malformed,

    #[error("password hashing failed: {0}")]
    HashFailed(String),
}

pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
