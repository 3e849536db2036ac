use thiserror::Error;

use agora_broadcast::BroadcastError;
use agora_store::StoreError;
use agora_types::{ResidentId, VotingId, VotingOptionId};

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("resident {resident} has already voted in voting {voting}")]
    DuplicateVote {
        voting: VotingId,
        resident: ResidentId,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("voting {0} is not active")]
    VotingInactive(VotingId),

    #[error("option {option} is not a valid choice for voting {voting}")]
    InvalidOption {
        voting: VotingId,
        option: VotingOptionId,
    },

    #[error("ledger error: {0}")]
    Store(StoreError),

    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
}

impl From<StoreError> for VotingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            other => Self::Store(other),
        }
    }
}
