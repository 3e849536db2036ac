use thiserror::Error;

use agora_store::StoreError;
use agora_types::VotingId;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("voting {0} has no loaded state")]
    Cold(VotingId),

    #[error("failed to load votes for voting {voting}: {source}")]
    Load {
        voting: VotingId,
        #[source]
        source: StoreError,
    },

    #[error("broadcast state lock poisoned")]
    Poisoned,
}
