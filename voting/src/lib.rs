//! The voting engine: submission, live results and quorum.
//!
//! - [`VoteSubmissionCoordinator`] validates a vote, writes it to the ledger
//!   and publishes it to the broadcast cache.
//! - [`results_for`] and [`quorum_for`] are pure functions over votes, options
//!   and units. Ownership coefficients are summed exactly and every displayed
//!   share is reported in basis points, rounded half to even.

pub mod coordinator;
pub mod error;
pub mod ordering;
pub mod quorum;
pub mod rate;
pub mod results;

pub use coordinator::{
    Broadcast, DeletedVote, SubmittedVote, VoteSubmissionCoordinator, VotingTally,
};
pub use error::VotingError;
pub use ordering::{compare_unit_numbers, natural_unit_order};
pub use quorum::{quorum_for, quorum_reached, QuorumReport};
pub use rate::{ratio_bps, FULL_BPS};
pub use results::{approval_reached, results_for, OptionResult, VotingResults};
