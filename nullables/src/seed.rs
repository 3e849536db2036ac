//! JSON seed data for the in-memory ledger.

use serde::{Deserialize, Serialize};
use std::path::Path;

use agora_store::StoreError;
use agora_types::{Business, PropertyUnit, Resident, Vote, Voting, VotingGroup, VotingOption};

/// Snapshot of everything the voting engine reads, as loaded from a file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSeed {
    #[serde(default)]
    pub businesses: Vec<Business>,
    #[serde(default)]
    pub property_units: Vec<PropertyUnit>,
    #[serde(default)]
    pub residents: Vec<Resident>,
    #[serde(default)]
    pub voting_groups: Vec<VotingGroup>,
    #[serde(default)]
    pub votings: Vec<Voting>,
    #[serde(default)]
    pub voting_options: Vec<VotingOption>,
    /// Votes already cast, e.g. when restoring a session.
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl LedgerSeed {
    pub fn from_json_str(s: &str) -> Result<Self, StoreError> {
        serde_json::from_str(s).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}
