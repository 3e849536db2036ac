//! Events carried by the broadcast cache.

use serde::Serialize;

use agora_types::VoteRecord;

/// A change to a voting's vote set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BroadcastEvent {
    NewVote(VoteRecord),
    VoteDeleted(VoteRecord),
}

impl BroadcastEvent {
    /// Wire name of the event, used as the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewVote(_) => "new_vote",
            Self::VoteDeleted(_) => "vote_deleted",
        }
    }

    pub fn record(&self) -> &VoteRecord {
        match self {
            Self::NewVote(r) | Self::VoteDeleted(r) => r,
        }
    }

    /// Same event with voter identity stripped.
    pub fn redacted(self) -> Self {
        match self {
            Self::NewVote(r) => Self::NewVote(r.redacted()),
            Self::VoteDeleted(r) => Self::VoteDeleted(r.redacted()),
        }
    }
}
