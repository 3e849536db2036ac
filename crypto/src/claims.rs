//! Signed claim sets carried by voting tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

use agora_types::{BusinessId, ResidentId, Timestamp, VotingGroupId, VotingId};

/// The two token kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    PublicVoting,
    VotingAuth,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicVoting => "public_voting",
            Self::VotingAuth => "voting_auth",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims of a public voting token (shared by QR code / link).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVotingClaims {
    pub voting_id: VotingId,
    pub voting_group_id: VotingGroupId,
    pub property_id: BusinessId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Claims of a voting auth token (one resident, short-lived).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingAuthClaims {
    pub resident_id: ResidentId,
    pub voting_id: VotingId,
    pub voting_group_id: VotingGroupId,
    pub property_id: BusinessId,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Everything a token can carry. The `scope` tag is part of the signed
/// payload and selects the variant during decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum TokenClaims {
    PublicVoting(PublicVotingClaims),
    VotingAuth(VotingAuthClaims),
}

impl TokenClaims {
    pub fn scope(&self) -> TokenScope {
        match self {
            Self::PublicVoting(_) => TokenScope::PublicVoting,
            Self::VotingAuth(_) => TokenScope::VotingAuth,
        }
    }

    pub fn expires_at(&self) -> Timestamp {
        match self {
            Self::PublicVoting(c) => c.expires_at,
            Self::VotingAuth(c) => c.expires_at,
        }
    }

    pub fn voting_id(&self) -> VotingId {
        match self {
            Self::PublicVoting(c) => c.voting_id,
            Self::VotingAuth(c) => c.voting_id,
        }
    }
}
