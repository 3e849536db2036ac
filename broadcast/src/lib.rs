//! Per-voting in-memory publish/subscribe cache.
//!
//! Each active voting gets its own [`hub::VotingHub`] holding the vote set
//! known so far and the live subscriber channels. Dashboards that connect
//! late receive a snapshot and then every later event exactly once.
//!
//! Delivery is best-effort: the ledger is the source of truth, and
//! publishing never blocks. A subscriber that cannot keep up is dropped and
//! is expected to reconnect for a fresh snapshot.

pub mod cache;
pub mod error;
pub mod event;
pub mod hub;

pub use cache::{VoteBroadcastCache, DEFAULT_SUBSCRIBER_BUFFER};
pub use error::BroadcastError;
pub use event::BroadcastEvent;
pub use hub::Subscription;
