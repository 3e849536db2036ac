//! Administrator endpoints under `/admin`, guarded by the admin API key.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use agora_store::VotingStore;
use agora_types::{Timestamp, VoteId, Voting, VotingGroup, VotingGroupId, VotingId, VotingOption};
use agora_voting::Broadcast;

use crate::auth::Admin;
use crate::error::ApiResult;
use crate::extract::IdPath;
use crate::metrics::ConnectionGuard;
use crate::response::{created, ok};
use crate::sse::vote_stream;
use crate::state::SharedState;
use crate::tracing_spans::{rpc_span, stream_span, voting_span};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingDetail {
    #[serde(flatten)]
    pub voting: Voting,
    pub options: Vec<VotingOption>,
}

/// `GET /admin/voting-groups/{id}`
pub async fn voting_group(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingGroupId>,
) -> ApiResult<impl IntoResponse> {
    rpc_span("voting_group").in_scope(|| -> ApiResult<_> {
        let group: VotingGroup = state.voting.ledger().get_voting_group(id)?;
        Ok(ok(group))
    })
}

/// `GET /admin/voting-groups/{id}/votings`
pub async fn group_votings(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingGroupId>,
) -> ApiResult<impl IntoResponse> {
    rpc_span("group_votings").in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        ledger.get_voting_group(id)?;
        Ok(ok(ledger.list_votings(id)?))
    })
}

/// `GET /admin/votings/{id}`
pub async fn voting(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("voting", id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voting = ledger.get_voting(id)?;
        let options = ledger.list_options(id)?;
        Ok(ok(VotingDetail { voting, options }))
    })
}

/// `POST /admin/votings/{id}/activate`
pub async fn activate(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("activate", id)
        .in_scope(|| -> ApiResult<_> { Ok(ok(state.voting.set_voting_active(id, true)?)) })
}

/// `POST /admin/votings/{id}/deactivate`
pub async fn deactivate(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("deactivate", id)
        .in_scope(|| -> ApiResult<_> { Ok(ok(state.voting.set_voting_active(id, false)?)) })
}

/// `GET /admin/votings/{id}/results`
pub async fn results(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("results", id).in_scope(|| -> ApiResult<_> {
        let tally = state.voting.tally(id)?;
        Ok(ok(tally))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumStatus {
    pub voting_id: VotingId,
    pub requires_quorum: bool,
    pub quorum_percentage: f64,
    pub quorum_reached: Option<bool>,
    #[serde(flatten)]
    pub report: agora_voting::QuorumReport,
}

/// `GET /admin/votings/{id}/quorum`
pub async fn quorum(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("quorum", id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voting = ledger.get_voting(id)?;
        let group = ledger.get_voting_group(voting.voting_group_id)?;
        let tally = state.voting.tally(id)?;
        Ok(ok(QuorumStatus {
            voting_id: id,
            requires_quorum: group.requires_quorum,
            quorum_percentage: group.quorum_percentage,
            quorum_reached: tally.quorum_reached,
            report: tally.quorum,
        }))
    })
}

/// `GET /admin/votings/{id}/votes`
pub async fn votes(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    voting_span("admin_votes", id).in_scope(|| -> ApiResult<_> {
        state.voting.ledger().get_voting(id)?;
        Ok(ok(state.voting.current_votes(id)?))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVoteResponse {
    pub vote_id: VoteId,
    pub voting_id: VotingId,
}

/// `DELETE /admin/votings/{id}/votes/{voteId}`
pub async fn delete_vote(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath((voting_id, vote_id)): IdPath<(VotingId, VoteId)>,
) -> ApiResult<impl IntoResponse> {
    voting_span("delete_vote", voting_id).in_scope(|| -> ApiResult<_> {
        let deleted = state.voting.delete_vote(vote_id, voting_id)?;
        state.metrics.votes_deleted.inc();
        if deleted.broadcast == Broadcast::Failed {
            state.metrics.broadcast_failures.inc();
        }
        Ok(ok(DeletedVoteResponse {
            vote_id: deleted.vote.id,
            voting_id,
        }))
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUrlRequest {
    pub duration_hours: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUrl {
    pub url: String,
    pub token: String,
    pub expires_at: Timestamp,
}

/// `POST /admin/votings/{id}/generate-public-url`
///
/// The body is optional; without one the configured default duration
/// applies.
pub async fn generate_public_url(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
    body: Result<Json<PublicUrlRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => PublicUrlRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    voting_span("generate_public_url", id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voting = ledger.get_voting(id)?;
        let group = ledger.get_voting_group(voting.voting_group_id)?;
        let hours = request
            .duration_hours
            .unwrap_or(state.settings.default_public_token_hours);

        let token = state
            .tokens
            .issue_public_token(voting.id, group.id, group.business_id, hours)?;
        let expires_at = state.tokens.validate_public_token(&token)?.expires_at;
        state.metrics.tokens_issued.inc();
        info!(voting = %id, hours, "public voting link issued");

        let url = format!(
            "{}/voting?token={token}",
            state.settings.public_base_url.trim_end_matches('/')
        );
        Ok(created(PublicUrl {
            url,
            token,
            expires_at,
        }))
    })
}

/// `GET /admin/votings/{id}/stream`
///
/// Same stream as the public one, never redacted.
pub async fn stream(
    State(state): State<SharedState>,
    _admin: Admin,
    IdPath(id): IdPath<VotingId>,
) -> ApiResult<impl IntoResponse> {
    let span = stream_span(id, "admin");
    let subscription = span.in_scope(|| -> ApiResult<_> {
        state.voting.ledger().get_voting(id)?;
        Ok(state.voting.subscribe(id)?)
    })?;
    Ok(vote_stream(
        subscription,
        state.settings.heartbeat,
        false,
        state.shutdown.subscribe(),
        Arc::clone(state.voting.clock()),
        ConnectionGuard::new(&state.metrics.sse_connections),
        span,
    ))
}
