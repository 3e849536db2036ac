//! Fundamental types for the Agora voting engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, timestamps, participation coefficients, and the voting and
//! property records the engine reads and writes.

pub mod coefficient;
pub mod ids;
pub mod property;
pub mod time;
pub mod voting;

pub use coefficient::{Coefficient, ParseCoefficientError};
pub use ids::{
    BusinessId, PropertyUnitId, ResidentId, VoteId, VotingGroupId, VotingId, VotingOptionId,
};
pub use property::{Business, PropertyUnit, Resident};
pub use time::{Clock, SystemClock, Timestamp};
pub use voting::{NewVote, Vote, VoteRecord, Voting, VotingGroup, VotingOption, VotingType};
