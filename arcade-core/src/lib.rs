pub mod canonical;
pub mod domain;
pub mod error;

pub mod prelude {
    pub use crate::canonical::canonical_checksum_input;
    pub use crate::domain::*;
    pub use crate::error::{ArcadeError, ArcadeResult};
}
