//! Nullable infrastructure for deterministic testing and local serving.
//!
//! External dependencies (clock, ledger) are abstracted behind traits. This
//! crate provides in-process implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! [`NullLedger`] honours the same contract as a relational store, including
//! the `(voting, resident)` uniqueness constraint, so the daemon can also run
//! on it when seeded from a [`LedgerSeed`] file. Serving code names it
//! [`InMemoryLedger`].

pub mod clock;
pub mod ledger;
pub mod seed;

pub use clock::NullClock;
pub use ledger::NullLedger;
pub use seed::LedgerSeed;

/// The in-memory ledger as the node serves from it.
pub type InMemoryLedger = NullLedger;
