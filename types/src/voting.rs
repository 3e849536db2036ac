//! Voting groups, votings, options and votes.

use serde::{Deserialize, Serialize};

use crate::{
    BusinessId, PropertyUnit, Resident, ResidentId, Timestamp, VoteId, VotingGroupId, VotingId,
    VotingOptionId,
};

/// A named batch of votings for one property, e.g. an annual assembly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingGroup {
    pub id: VotingGroupId,
    pub business_id: BusinessId,
    pub name: String,
    #[serde(default)]
    pub starts_at: Option<Timestamp>,
    #[serde(default)]
    pub ends_at: Option<Timestamp>,
    #[serde(default)]
    pub requires_quorum: bool,
    /// Quorum threshold in percent of total participation coefficient.
    #[serde(default)]
    pub quorum_percentage: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingType {
    /// Yes / no (optionally abstain).
    Binary,
    /// One choice among several options.
    MultipleChoice,
}

/// One question within a voting group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voting {
    pub id: VotingId,
    pub voting_group_id: VotingGroupId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub voting_type: VotingType,
    /// Secret votings never expose who voted for what on public surfaces.
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub allow_abstention: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: u32,
    /// Share of votes an option needs to be approved, in percent.
    #[serde(default)]
    pub required_approval_percentage: f64,
}

/// A selectable answer for a voting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingOption {
    pub id: VotingOptionId,
    pub voting_id: VotingId,
    pub text: String,
    pub code: String,
    #[serde(default)]
    pub display_order: u32,
    /// UI color, e.g. `"#22c55e"`.
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A vote to be written to the ledger; the ledger assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVote {
    pub voting_id: VotingId,
    pub resident_id: ResidentId,
    pub voting_option_id: VotingOptionId,
    pub voted_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub notes: Option<String>,
}

/// The fact "resident R chose option O in voting V at time T".
///
/// Immutable once written; only an admin hard delete removes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: VoteId,
    pub voting_id: VotingId,
    pub resident_id: ResidentId,
    pub voting_option_id: VotingOptionId,
    pub voted_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub notes: Option<String>,
}

impl Vote {
    pub fn from_new(id: VoteId, new: NewVote) -> Self {
        Self {
            id,
            voting_id: new.voting_id,
            resident_id: new.resident_id,
            voting_option_id: new.voting_option_id,
            voted_at: new.voted_at,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            notes: new.notes,
        }
    }
}

/// Display projection of a vote, joined with its option and voter.
///
/// This is what dashboards receive: the option color travels with the vote
/// so a live chart never needs a second lookup. Request metadata (IP, user
/// agent) is never part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: VoteId,
    pub voting_id: VotingId,
    pub voting_option_id: VotingOptionId,
    pub voted_at: Timestamp,
    pub option_text: String,
    pub option_code: String,
    pub option_color: String,
    pub resident_id: Option<ResidentId>,
    pub resident_name: Option<String>,
    pub property_unit_number: Option<String>,
}

impl VoteRecord {
    pub fn new(
        vote: &Vote,
        option: &VotingOption,
        resident: Option<&Resident>,
        unit: Option<&PropertyUnit>,
    ) -> Self {
        Self {
            id: vote.id,
            voting_id: vote.voting_id,
            voting_option_id: vote.voting_option_id,
            voted_at: vote.voted_at,
            option_text: option.text.clone(),
            option_code: option.code.clone(),
            option_color: option.color.clone(),
            resident_id: Some(vote.resident_id),
            resident_name: resident.map(|r| r.name.clone()),
            property_unit_number: unit.map(|u| u.number.clone()),
        }
    }

    /// Strip voter identity, for secret votings on public surfaces.
    pub fn redacted(mut self) -> Self {
        self.resident_id = None;
        self.resident_name = None;
        self.property_unit_number = None;
        self
    }
}

fn default_true() -> bool {
    true
}
