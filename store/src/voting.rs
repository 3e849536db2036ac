//! Voting storage trait (groups, votings, options).

use crate::StoreError;
use agora_types::{Voting, VotingGroup, VotingGroupId, VotingId, VotingOption, VotingOptionId};

pub trait VotingStore {
    fn get_voting_group(&self, id: VotingGroupId) -> Result<VotingGroup, StoreError>;

    /// Votings of a group ordered by display order.
    fn list_votings(&self, group: VotingGroupId) -> Result<Vec<Voting>, StoreError>;

    fn get_voting(&self, id: VotingId) -> Result<Voting, StoreError>;

    /// Explicitly activate or deactivate a voting, returning the updated row.
    fn set_voting_active(&self, id: VotingId, active: bool) -> Result<Voting, StoreError>;

    /// Options of a voting ordered by display order, inactive ones included.
    fn list_options(&self, voting: VotingId) -> Result<Vec<VotingOption>, StoreError>;

    fn get_option(&self, id: VotingOptionId) -> Result<VotingOption, StoreError>;
}
