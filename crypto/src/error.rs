use thiserror::Error;

use agora_types::Timestamp;

use crate::TokenScope;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token expired at {0}")]
    Expired(Timestamp),

    #[error("token has scope {found}, expected {expected}")]
    WrongScope {
        expected: TokenScope,
        found: TokenScope,
    },

    #[error("token duration must be between 1 and {max} hours, got {got}")]
    InvalidDuration { got: u32, max: u32 },

    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("signing error: {0}")]
    Signing(String),
}

impl TokenError {
    /// Whether the caller presented a valid token of the wrong kind, as
    /// opposed to a token that is not valid at all.
    pub fn is_wrong_scope(&self) -> bool {
        matches!(self, Self::WrongScope { .. })
    }
}
