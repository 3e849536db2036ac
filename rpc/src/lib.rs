//! HTTP surface of the Agora voting engine.
//!
//! - `/public`: the resident flow, authenticated with public voting tokens
//!   and voting auth tokens, including the live vote stream.
//! - `/admin`: voting management, results, quorum and the dashboard stream,
//!   authenticated with the admin API key.
//! - `/health` and `/metrics`.
//!
//! Every response body is a JSON envelope: `{"success": true, "data": ..}`
//! or `{"success": false, "message": ..}`.

pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod public;
pub mod response;
pub mod server;
pub mod sse;
pub mod state;
pub mod tracing_spans;

pub use error::{ApiError, ApiResult};
pub use metrics::VotingMetrics;
pub use server::{router, RpcServer};
pub use state::{ApiSettings, AppState, SharedState};
