//! Thread-safe in-memory vote ledger.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use agora_store::{PropertyStore, StoreError, VoteStore, VotingStore};
use agora_types::{
    Business, BusinessId, NewVote, PropertyUnit, PropertyUnitId, Resident, ResidentId, Vote,
    VoteId, Voting, VotingGroup, VotingGroupId, VotingId, VotingOption, VotingOptionId,
};

use crate::LedgerSeed;

#[derive(Default)]
struct Tables {
    businesses: BTreeMap<BusinessId, Business>,
    units: BTreeMap<PropertyUnitId, PropertyUnit>,
    residents: BTreeMap<ResidentId, Resident>,
    groups: BTreeMap<VotingGroupId, VotingGroup>,
    votings: BTreeMap<VotingId, Voting>,
    options: BTreeMap<VotingOptionId, VotingOption>,
    votes: BTreeMap<VoteId, Vote>,
    /// Unique index on (voting, resident).
    ballots: HashMap<(VotingId, ResidentId), VoteId>,
    last_vote_id: u64,
}

/// An in-memory vote ledger.
///
/// All tables sit behind one mutex, so every operation is atomic, including
/// the unique-index check inside [`VoteStore::insert_vote`].
#[derive(Default)]
pub struct NullLedger {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from seed data.
    pub fn from_seed(seed: LedgerSeed) -> Result<Self, StoreError> {
        let ledger = Self::new();
        {
            let mut t = ledger.tables()?;
            t.businesses.extend(seed.businesses.into_iter().map(|b| (b.id, b)));
            t.units.extend(seed.property_units.into_iter().map(|u| (u.id, u)));
            t.residents.extend(seed.residents.into_iter().map(|r| (r.id, r)));
            t.groups.extend(seed.voting_groups.into_iter().map(|g| (g.id, g)));
            t.votings.extend(seed.votings.into_iter().map(|v| (v.id, v)));
            t.options.extend(seed.voting_options.into_iter().map(|o| (o.id, o)));
            for vote in seed.votes {
                let key = (vote.voting_id, vote.resident_id);
                if t.ballots.contains_key(&key) {
                    return Err(StoreError::Duplicate(format!(
                        "voting {} resident {}",
                        key.0, key.1
                    )));
                }
                t.last_vote_id = t.last_vote_id.max(vote.id.get());
                t.ballots.insert(key, vote.id);
                t.votes.insert(vote.id, vote);
            }
        }
        Ok(ledger)
    }

    /// Make every subsequent call fail with a backend error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn add_business(&self, business: Business) -> Result<(), StoreError> {
        self.tables()?.businesses.insert(business.id, business);
        Ok(())
    }

    pub fn add_property_unit(&self, unit: PropertyUnit) -> Result<(), StoreError> {
        self.tables()?.units.insert(unit.id, unit);
        Ok(())
    }

    pub fn add_resident(&self, resident: Resident) -> Result<(), StoreError> {
        self.tables()?.residents.insert(resident.id, resident);
        Ok(())
    }

    pub fn add_voting_group(&self, group: VotingGroup) -> Result<(), StoreError> {
        self.tables()?.groups.insert(group.id, group);
        Ok(())
    }

    pub fn add_voting(&self, voting: Voting) -> Result<(), StoreError> {
        self.tables()?.votings.insert(voting.id, voting);
        Ok(())
    }

    pub fn add_option(&self, option: VotingOption) -> Result<(), StoreError> {
        self.tables()?.options.insert(option.id, option);
        Ok(())
    }

    /// Total number of vote rows across all votings.
    pub fn vote_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.votes.len())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("ledger unavailable".into()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("ledger lock poisoned".into()))
    }
}

fn not_found(kind: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{kind} {id}"))
}

impl PropertyStore for NullLedger {
    fn get_business(&self, id: BusinessId) -> Result<Business, StoreError> {
        self.tables()?
            .businesses
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("business", id))
    }

    fn get_property_unit(&self, id: PropertyUnitId) -> Result<PropertyUnit, StoreError> {
        self.tables()?
            .units
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("property unit", id))
    }

    fn list_property_units(&self, business: BusinessId) -> Result<Vec<PropertyUnit>, StoreError> {
        Ok(self
            .tables()?
            .units
            .values()
            .filter(|u| u.business_id == business)
            .cloned()
            .collect())
    }

    fn get_resident(&self, id: ResidentId) -> Result<Resident, StoreError> {
        self.tables()?
            .residents
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("resident", id))
    }

    fn list_unit_residents(&self, unit: PropertyUnitId) -> Result<Vec<Resident>, StoreError> {
        Ok(self
            .tables()?
            .residents
            .values()
            .filter(|r| r.property_unit_id == unit)
            .cloned()
            .collect())
    }
}

impl VotingStore for NullLedger {
    fn get_voting_group(&self, id: VotingGroupId) -> Result<VotingGroup, StoreError> {
        self.tables()?
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("voting group", id))
    }

    fn list_votings(&self, group: VotingGroupId) -> Result<Vec<Voting>, StoreError> {
        let mut votings: Vec<Voting> = self
            .tables()?
            .votings
            .values()
            .filter(|v| v.voting_group_id == group)
            .cloned()
            .collect();
        votings.sort_by_key(|v| (v.display_order, v.id));
        Ok(votings)
    }

    fn get_voting(&self, id: VotingId) -> Result<Voting, StoreError> {
        self.tables()?
            .votings
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("voting", id))
    }

    fn set_voting_active(&self, id: VotingId, active: bool) -> Result<Voting, StoreError> {
        let mut t = self.tables()?;
        let voting = t.votings.get_mut(&id).ok_or_else(|| not_found("voting", id))?;
        voting.is_active = active;
        Ok(voting.clone())
    }

    fn list_options(&self, voting: VotingId) -> Result<Vec<VotingOption>, StoreError> {
        let mut options: Vec<VotingOption> = self
            .tables()?
            .options
            .values()
            .filter(|o| o.voting_id == voting)
            .cloned()
            .collect();
        options.sort_by_key(|o| (o.display_order, o.id));
        Ok(options)
    }

    fn get_option(&self, id: VotingOptionId) -> Result<VotingOption, StoreError> {
        self.tables()?
            .options
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("voting option", id))
    }
}

impl VoteStore for NullLedger {
    fn has_voted(&self, voting: VotingId, resident: ResidentId) -> Result<bool, StoreError> {
        Ok(self.tables()?.ballots.contains_key(&(voting, resident)))
    }

    fn insert_vote(&self, vote: NewVote) -> Result<Vote, StoreError> {
        let mut t = self.tables()?;
        let key = (vote.voting_id, vote.resident_id);
        if t.ballots.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "voting {} resident {}",
                key.0, key.1
            )));
        }
        t.last_vote_id += 1;
        let id = VoteId::new(t.last_vote_id);
        let vote = Vote::from_new(id, vote);
        t.ballots.insert(key, id);
        t.votes.insert(id, vote.clone());
        tracing::trace!(vote = %id, voting = %key.0, resident = %key.1, "vote row inserted");
        Ok(vote)
    }

    fn get_vote(&self, id: VoteId) -> Result<Vote, StoreError> {
        self.tables()?
            .votes
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("vote", id))
    }

    fn find_vote(
        &self,
        voting: VotingId,
        resident: ResidentId,
    ) -> Result<Option<Vote>, StoreError> {
        let t = self.tables()?;
        Ok(t
            .ballots
            .get(&(voting, resident))
            .and_then(|id| t.votes.get(id))
            .cloned())
    }

    fn list_votes(&self, voting: VotingId) -> Result<Vec<Vote>, StoreError> {
        let mut votes: Vec<Vote> = self
            .tables()?
            .votes
            .values()
            .filter(|v| v.voting_id == voting)
            .cloned()
            .collect();
        votes.sort_by_key(|v| (v.voted_at, v.id));
        Ok(votes)
    }

    fn delete_vote(&self, id: VoteId) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        let vote = t.votes.remove(&id).ok_or_else(|| not_found("vote", id))?;
        t.ballots.remove(&(vote.voting_id, vote.resident_id));
        Ok(())
    }
}
