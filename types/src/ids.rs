//! Strongly typed record identifiers.
//!
//! Every table the engine touches is keyed by a 64-bit integer. Wrapping each
//! key in its own type keeps a vote id from ever being passed where a voting
//! id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// A business (property / condominium) tenant.
    BusinessId
);
id_type!(
    /// A batch of votings, e.g. one annual assembly.
    VotingGroupId
);
id_type!(
    /// A single question inside a voting group.
    VotingId
);
id_type!(
    /// A selectable answer of a voting.
    VotingOptionId
);
id_type!(
    /// A cast vote.
    VoteId
);
id_type!(PropertyUnitId);
id_type!(ResidentId);
