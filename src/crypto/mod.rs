pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Unsupported password hash method: {0}")]
    UnsupportedMethod(String),

    #[error("Malformed password hash")]
    MalformedHash,
}
