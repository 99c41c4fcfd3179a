use thiserror::Error;

/// Discriminated failure kinds shared across every component. The HTTP
/// boundary is the only layer that turns these into status codes; nothing
/// below it should format a user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArcadeError {
    #[error("malformed input: {0}")]
    InputShape(String),

    #[error("missing or invalid access token")]
    Unauthenticated,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not verified")]
    NotVerified,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("save conflict, refetch before retrying")]
    Conflict,

    #[error("rate limited, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("session token invalid")]
    BadSession,

    #[error("checksum mismatch")]
    BadChecksum,

    #[error("email already in use")]
    EmailInUse,

    #[error("verification code invalid or expired")]
    BadCode,

    #[error("too many attempts")]
    TooManyAttempts,

    #[error("upstream signature invalid")]
    BadSignature,

    #[error("internal error")]
    Internal(String),
}

pub type ArcadeResult<T> = std::result::Result<T, ArcadeError>;
