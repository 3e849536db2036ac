//! Span constructors shared by the HTTP handlers.
//!
//! Consistent span names and fields make requests easy to filter and
//! correlate in any tracing backend.

use tracing::{info_span, Span};

use agora_types::VotingId;

/// Span covering a single API action.
pub fn rpc_span(action: &str) -> Span {
    info_span!("rpc", action = %action)
}

/// Span covering a request scoped to one voting.
pub fn voting_span(action: &str, voting: VotingId) -> Span {
    info_span!("rpc", action = %action, voting = %voting)
}

/// Span covering the lifetime of one live vote stream.
pub fn stream_span(voting: VotingId, audience: &str) -> Span {
    info_span!("vote_stream", voting = %voting, audience = %audience)
}
