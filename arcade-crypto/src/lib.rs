pub mod access;
pub mod codes;
pub mod error;
pub mod hmac_token;
pub mod password;

pub use access::{AccessClaims, AccessTokenizer};
pub use codes::{generate_numeric_code, generate_opaque_token};
pub use error::{CryptoError, CryptoResult};
pub use hmac_token::{HmacPurpose, HmacSigner};
pub use password::{hash_password, verify_password};
