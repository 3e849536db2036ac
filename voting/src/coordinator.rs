//! Vote submission: validate, write to the ledger, then broadcast.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use agora_broadcast::{BroadcastEvent, Subscription, VoteBroadcastCache};
use agora_store::{OptionalExt, PropertyStore, StoreError, VoteLedger, VoteStore, VotingStore};
use agora_types::{
    Clock, NewVote, PropertyUnit, Resident, ResidentId, SystemClock, Vote, VoteId, VoteRecord,
    Voting, VotingId, VotingOptionId,
};

use crate::quorum::{quorum_for, QuorumReport};
use crate::results::{approval_reached, results_for, VotingResults};
use crate::VotingError;

/// What happened to the live broadcast of a ledger change.
///
/// The ledger write has already succeeded either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Broadcast {
    /// Queued for this many live subscribers.
    Delivered(usize),
    Failed,
}

#[derive(Clone, Debug)]
pub struct SubmittedVote {
    pub vote: Vote,
    pub record: VoteRecord,
    pub broadcast: Broadcast,
}

#[derive(Clone, Debug)]
pub struct DeletedVote {
    pub vote: Vote,
    pub broadcast: Broadcast,
}

/// Results and attendance of one voting.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingTally {
    pub results: VotingResults,
    pub quorum: QuorumReport,
    /// `None` when the voting group does not require quorum.
    pub quorum_reached: Option<bool>,
    /// First option, in display order, holding the required approval share.
    /// `None` when no approval share is configured or none reaches it.
    pub approved_option: Option<String>,
}

/// Orchestrates vote writes against the ledger and the live broadcast cache.
///
/// The ledger's unique index on `(voting, resident)` is what guarantees one
/// vote per resident; the `has_voted` check here only spares the write.
pub struct VoteSubmissionCoordinator {
    ledger: Arc<dyn VoteLedger>,
    cache: Arc<VoteBroadcastCache>,
    clock: Arc<dyn Clock>,
}

impl VoteSubmissionCoordinator {
    pub fn new(ledger: Arc<dyn VoteLedger>, cache: Arc<VoteBroadcastCache>) -> Self {
        Self::with_clock(ledger, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ledger: Arc<dyn VoteLedger>,
        cache: Arc<VoteBroadcastCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            cache,
            clock,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn VoteLedger> {
        &self.ledger
    }

    pub fn cache(&self) -> &Arc<VoteBroadcastCache> {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Cast a vote for `resident` in `voting`.
    pub fn submit_vote(
        &self,
        voting_id: VotingId,
        resident_id: ResidentId,
        option_id: VotingOptionId,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<SubmittedVote, VotingError> {
        let voting = self.ledger.get_voting(voting_id)?;
        if !voting.is_active {
            return Err(VotingError::VotingInactive(voting_id));
        }
        let option = self
            .ledger
            .get_option(option_id)
            .optional()?
            .filter(|o| o.voting_id == voting_id && o.is_active)
            .ok_or(VotingError::InvalidOption {
                voting: voting_id,
                option: option_id,
            })?;

        let duplicate = VotingError::DuplicateVote {
            voting: voting_id,
            resident: resident_id,
        };
        if self.ledger.has_voted(voting_id, resident_id)? {
            debug!(voting = %voting_id, resident = %resident_id, "duplicate vote rejected before write");
            return Err(duplicate);
        }

        let vote = match self.ledger.insert_vote(NewVote {
            voting_id,
            resident_id,
            voting_option_id: option.id,
            voted_at: self.clock.now(),
            ip_address,
            user_agent,
            notes: None,
        }) {
            Ok(vote) => vote,
            Err(StoreError::Duplicate(_)) => {
                debug!(voting = %voting_id, resident = %resident_id, "duplicate vote rejected by ledger");
                return Err(duplicate);
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            vote = %vote.id,
            voting = %voting_id,
            resident = %resident_id,
            option = %option.id,
            "vote recorded"
        );

        // The vote is committed: display lookups from here on must not fail it.
        let (resident, unit) = self.voter_details(&vote);
        let record = VoteRecord::new(&vote, &option, resident.as_ref(), unit.as_ref());
        let broadcast = self.publish(voting_id, BroadcastEvent::NewVote(record.clone()));

        Ok(SubmittedVote {
            vote,
            record,
            broadcast,
        })
    }

    /// Hard-delete a vote, freeing the resident to vote again.
    ///
    /// The vote must belong to `voting_id`; otherwise it is reported as not
    /// found.
    pub fn delete_vote(
        &self,
        vote_id: VoteId,
        voting_id: VotingId,
    ) -> Result<DeletedVote, VotingError> {
        let vote = self.ledger.get_vote(vote_id)?;
        if vote.voting_id != voting_id {
            return Err(VotingError::NotFound(format!(
                "vote {vote_id} in voting {voting_id}"
            )));
        }
        let record = self.ledger.vote_record(&vote)?;
        self.ledger.delete_vote(vote_id)?;
        info!(
            vote = %vote_id,
            voting = %voting_id,
            resident = %vote.resident_id,
            "vote deleted"
        );

        let broadcast = self.publish(voting_id, BroadcastEvent::VoteDeleted(record));
        Ok(DeletedVote { vote, broadcast })
    }

    /// Resident and unit of a recorded vote, or `None` where the lookup fails.
    fn voter_details(&self, vote: &Vote) -> (Option<Resident>, Option<PropertyUnit>) {
        let resident = match self.ledger.get_resident(vote.resident_id).optional() {
            Ok(resident) => resident,
            Err(e) => {
                warn!(vote = %vote.id, resident = %vote.resident_id, error = %e, "resident lookup failed after vote was recorded");
                return (None, None);
            }
        };
        let unit = match &resident {
            Some(r) => match self.ledger.get_property_unit(r.property_unit_id).optional() {
                Ok(unit) => unit,
                Err(e) => {
                    warn!(vote = %vote.id, unit = %r.property_unit_id, error = %e, "unit lookup failed after vote was recorded");
                    None
                }
            },
            None => None,
        };
        (resident, unit)
    }

    fn publish(&self, voting_id: VotingId, event: BroadcastEvent) -> Broadcast {
        let kind = event.kind();
        match self.cache.publish(voting_id, event) {
            Ok(delivered) => {
                debug!(voting = %voting_id, kind, delivered, "event published");
                Broadcast::Delivered(delivered)
            }
            Err(e) => {
                warn!(voting = %voting_id, kind, error = %e, "broadcast failed, ledger is unaffected");
                Broadcast::Failed
            }
        }
    }

    /// Subscribe to live votes, warming the cache from the ledger if needed.
    pub fn subscribe(&self, voting_id: VotingId) -> Result<Subscription, VotingError> {
        let ledger = Arc::clone(&self.ledger);
        Ok(self
            .cache
            .subscribe_or_load(voting_id, move || ledger.vote_records(voting_id))?)
    }

    /// Current votes of a voting, from the cache when warm.
    ///
    /// A cold voting is read from the ledger without warming the cache: only
    /// a load under the hub lock can warm it without missing a racing vote.
    pub fn current_votes(&self, voting_id: VotingId) -> Result<Vec<VoteRecord>, VotingError> {
        match self.cache.get_state(voting_id) {
            Ok(Some(votes)) => return Ok(votes),
            Ok(None) => {}
            Err(e) => warn!(voting = %voting_id, error = %e, "cache unavailable, reading ledger"),
        }
        Ok(self.ledger.vote_records(voting_id)?)
    }

    /// Activate or deactivate a voting.
    pub fn set_voting_active(
        &self,
        voting_id: VotingId,
        active: bool,
    ) -> Result<Voting, VotingError> {
        let voting = self.ledger.set_voting_active(voting_id, active)?;
        info!(voting = %voting_id, active, "voting activation changed");
        Ok(voting)
    }

    /// Results, attendance and threshold checks for a voting.
    ///
    /// A unit attends when any of its residents has voted.
    pub fn tally(&self, voting_id: VotingId) -> Result<VotingTally, VotingError> {
        let voting = self.ledger.get_voting(voting_id)?;
        let group = self.ledger.get_voting_group(voting.voting_group_id)?;
        let options = self.ledger.list_options(voting_id)?;
        let votes = self.current_votes(voting_id)?;
        let results = results_for(voting_id, &votes, &options);

        let mut attended = HashSet::new();
        for vote in self.ledger.list_votes(voting_id)? {
            if let Some(resident) = self.ledger.get_resident(vote.resident_id).optional()? {
                attended.insert(resident.property_unit_id);
            }
        }
        let units = self.ledger.list_property_units(group.business_id)?;
        let quorum = quorum_for(&units, &attended);

        let quorum_reached = group
            .requires_quorum
            .then(|| quorum.reached(group.quorum_percentage));
        let approved_option = if voting.required_approval_percentage > 0.0 {
            results
                .options
                .iter()
                .find(|o| approval_reached(&results, &o.code, voting.required_approval_percentage))
                .map(|o| o.code.clone())
        } else {
            None
        };

        Ok(VotingTally {
            results,
            quorum,
            quorum_reached,
            approved_option,
        })
    }
}
