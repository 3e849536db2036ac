//! Agora voting node: configuration, logging, shutdown and the process that
//! ties the voting engine to its HTTP surface.
//!
//! The node owns:
//! - the vote ledger (in memory, optionally seeded from a JSON file)
//! - the live vote cache and its idle sweeper
//! - the token authority and metrics registry
//! - the HTTP server and its graceful shutdown

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::AgoraNode;
pub use shutdown::ShutdownController;
