//! Vote ledger storage traits for the Agora voting engine.
//!
//! The durable store (a relational database in production, in-memory for
//! testing) implements these traits. The rest of the codebase depends only
//! on the traits.

pub mod error;
pub mod property;
pub mod vote;
pub mod voting;

pub use error::{OptionalExt, StoreError};
pub use property::PropertyStore;
pub use vote::VoteStore;
pub use voting::VotingStore;

use agora_types::{Vote, VoteRecord, VotingId};
use std::collections::HashMap;

/// Everything the voting engine needs from the ledger, behind one object.
pub trait VoteLedger: VoteStore + VotingStore + PropertyStore + Send + Sync {
    /// Join a vote with its option, voter and unit for display.
    fn vote_record(&self, vote: &Vote) -> Result<VoteRecord, StoreError> {
        let option = self.get_option(vote.voting_option_id)?;
        let resident = self.get_resident(vote.resident_id).optional()?;
        let unit = match &resident {
            Some(r) => self.get_property_unit(r.property_unit_id).optional()?,
            None => None,
        };
        Ok(VoteRecord::new(vote, &option, resident.as_ref(), unit.as_ref()))
    }

    /// Display records for every vote of a voting, in casting order.
    fn vote_records(&self, voting: VotingId) -> Result<Vec<VoteRecord>, StoreError> {
        let options: HashMap<_, _> = self
            .list_options(voting)?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let mut records = Vec::new();
        for vote in self.list_votes(voting)? {
            let record = match options.get(&vote.voting_option_id) {
                Some(option) => {
                    let resident = self.get_resident(vote.resident_id).optional()?;
                    let unit = match &resident {
                        Some(r) => self.get_property_unit(r.property_unit_id).optional()?,
                        None => None,
                    };
                    VoteRecord::new(&vote, option, resident.as_ref(), unit.as_ref())
                }
                None => self.vote_record(&vote)?,
            };
            records.push(record);
        }
        Ok(records)
    }
}

impl<T> VoteLedger for T where T: VoteStore + VotingStore + PropertyStore + Send + Sync {}
