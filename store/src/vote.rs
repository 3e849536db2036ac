//! Vote storage trait.

use crate::StoreError;
use agora_types::{NewVote, ResidentId, Vote, VoteId, VotingId};

/// Durable vote storage.
///
/// Implementations must enforce uniqueness of `(voting_id, resident_id)` at
/// write time: [`VoteStore::insert_vote`] fails with
/// [`StoreError::Duplicate`] when the pair already exists, even if a
/// concurrent writer inserted it a moment earlier. This is the only place
/// the one-vote-per-resident rule is guaranteed.
pub trait VoteStore {
    fn has_voted(&self, voting: VotingId, resident: ResidentId) -> Result<bool, StoreError>;

    fn insert_vote(&self, vote: NewVote) -> Result<Vote, StoreError>;

    fn get_vote(&self, id: VoteId) -> Result<Vote, StoreError>;

    fn find_vote(&self, voting: VotingId, resident: ResidentId)
        -> Result<Option<Vote>, StoreError>;

    /// Votes of a voting ordered by time of casting.
    fn list_votes(&self, voting: VotingId) -> Result<Vec<Vote>, StoreError>;

    /// Hard delete. Frees the resident to vote again.
    fn delete_vote(&self, id: VoteId) -> Result<(), StoreError>;
}
