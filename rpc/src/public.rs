//! Resident-facing endpoints under `/public`.
//!
//! The flow is: open the voting link (public voting token), find your unit,
//! prove who you are with your document number, then vote with the voting
//! auth token you get back.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use agora_store::{OptionalExt, PropertyStore, VoteStore, VotingStore};
use agora_types::{
    Business, PropertyUnitId, ResidentId, Timestamp, VoteRecord, Voting, VotingGroup,
    VotingOption, VotingOptionId,
};
use agora_voting::{natural_unit_order, results_for, Broadcast, VotingResults};

use crate::auth::{AuthenticatedVoter, PublicVoter};
use crate::error::{ApiError, ApiResult};
use crate::metrics::ConnectionGuard;
use crate::response::{created, ok};
use crate::sse::vote_stream;
use crate::state::SharedState;
use crate::tracing_spans::{rpc_span, stream_span, voting_span};

/// A voting as residents see it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicVoting {
    #[serde(flatten)]
    pub voting: Voting,
    pub options: Vec<VotingOption>,
}

fn active_options(options: Vec<VotingOption>) -> Vec<VotingOption> {
    options.into_iter().filter(|o| o.is_active).collect()
}

fn public_records(voting: &Voting, records: Vec<VoteRecord>) -> Vec<VoteRecord> {
    if voting.is_secret {
        records.into_iter().map(VoteRecord::redacted).collect()
    } else {
        records
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingContext {
    pub business: Business,
    pub voting_group: VotingGroup,
    pub voting: PublicVoting,
    pub expires_at: Timestamp,
}

/// `GET /public/voting-context`
pub async fn voting_context(
    State(state): State<SharedState>,
    PublicVoter(claims): PublicVoter,
) -> ApiResult<impl IntoResponse> {
    voting_span("voting_context", claims.voting_id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voting = ledger.get_voting(claims.voting_id)?;
        let voting_group = ledger.get_voting_group(claims.voting_group_id)?;
        let business = ledger.get_business(claims.property_id)?;
        let options = active_options(ledger.list_options(voting.id)?);
        Ok(ok(VotingContext {
            business,
            voting_group,
            voting: PublicVoting { voting, options },
            expires_at: claims.expires_at,
        }))
    })
}

#[derive(Debug, Deserialize)]
pub struct UnitQuery {
    pub number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub id: PropertyUnitId,
    pub number: String,
}

/// `GET /public/property-units?number=`
///
/// Units of the property in natural order, optionally filtered by a
/// case-insensitive fragment of the unit number.
pub async fn property_units(
    State(state): State<SharedState>,
    PublicVoter(claims): PublicVoter,
    query: Result<Query<UnitQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    rpc_span("property_units").in_scope(|| -> ApiResult<_> {
        let mut units = state.voting.ledger().list_property_units(claims.property_id)?;
        if let Some(fragment) = query.number.map(|n| n.trim().to_lowercase()) {
            if !fragment.is_empty() {
                units.retain(|u| u.number.to_lowercase().contains(&fragment));
            }
        }
        natural_unit_order(&mut units);
        let units: Vec<_> = units
            .into_iter()
            .map(|u| UnitSummary {
                id: u.id,
                number: u.number,
            })
            .collect();
        Ok(ok(units))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResidentRequest {
    pub property_unit_id: PropertyUnitId,
    pub dni: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentSummary {
    pub id: ResidentId,
    pub name: String,
    pub is_main_resident: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedResident {
    pub token: String,
    pub expires_at: Timestamp,
    pub resident: ResidentSummary,
    pub property_unit: UnitSummary,
    pub has_voted: bool,
}

/// `POST /public/validate-resident`
///
/// Exchanges a public voting token plus proof of identity for a voting auth
/// token.
pub async fn validate_resident(
    State(state): State<SharedState>,
    PublicVoter(claims): PublicVoter,
    body: Result<Json<ValidateResidentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    voting_span("validate_resident", claims.voting_id).in_scope(|| -> ApiResult<_> {
        if request.dni.trim().is_empty() {
            return Err(ApiError::Validation("dni is required".into()));
        }
        let ledger = state.voting.ledger();
        let unit = ledger
            .get_property_unit(request.property_unit_id)
            .optional()?
            .filter(|u| u.business_id == claims.property_id)
            .ok_or_else(|| ApiError::NotFound("property unit not found".into()))?;
        let resident = ledger
            .list_unit_residents(unit.id)?
            .into_iter()
            .find(|r| r.dni_matches(&request.dni))
            .ok_or_else(|| ApiError::NotFound("resident not found in this unit".into()))?;
        if !resident.is_active {
            return Err(ApiError::Forbidden("resident is not active".into()));
        }

        let token = state.tokens.issue_auth_token(
            resident.id,
            claims.voting_id,
            claims.voting_group_id,
            claims.property_id,
        )?;
        let expires_at = state.tokens.validate_auth_token(&token)?.expires_at;
        state.metrics.tokens_issued.inc();
        let has_voted = ledger.has_voted(claims.voting_id, resident.id)?;
        info!(resident = %resident.id, unit = %unit.id, "resident validated");

        Ok(ok(ValidatedResident {
            token,
            expires_at,
            resident: ResidentSummary {
                id: resident.id,
                name: resident.name,
                is_main_resident: resident.is_main_resident,
            },
            property_unit: UnitSummary {
                id: unit.id,
                number: unit.number,
            },
            has_voted,
        }))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingInfo {
    pub voting: PublicVoting,
    pub has_voted: bool,
    pub my_vote: Option<VoteRecord>,
    /// Live results, only once the resident has voted.
    pub results: Option<VotingResults>,
}

/// `GET /public/voting-info`
pub async fn voting_info(
    State(state): State<SharedState>,
    AuthenticatedVoter(claims): AuthenticatedVoter,
) -> ApiResult<impl IntoResponse> {
    voting_span("voting_info", claims.voting_id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voting = ledger.get_voting(claims.voting_id)?;
        let all_options = ledger.list_options(voting.id)?;
        let my_vote = match ledger.find_vote(voting.id, claims.resident_id)? {
            Some(vote) => Some(ledger.vote_record(&vote)?),
            None => None,
        };
        let results = match my_vote {
            Some(_) => {
                let votes = state.voting.current_votes(voting.id)?;
                Some(results_for(voting.id, &votes, &all_options))
            }
            None => None,
        };
        Ok(ok(VotingInfo {
            has_voted: my_vote.is_some(),
            my_vote,
            results,
            voting: PublicVoting {
                voting,
                options: active_options(all_options),
            },
        }))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub voting_option_id: VotingOptionId,
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };
    forwarded
        .or_else(real)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// `POST /public/vote`
pub async fn cast_vote(
    State(state): State<SharedState>,
    AuthenticatedVoter(claims): AuthenticatedVoter,
    headers: HeaderMap,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    voting_span("cast_vote", claims.voting_id).in_scope(|| -> ApiResult<_> {
        let submitted = state
            .voting
            .submit_vote(
                claims.voting_id,
                claims.resident_id,
                request.voting_option_id,
                client_ip(&headers),
                user_agent(&headers),
            )
            .inspect_err(|e| {
                if matches!(e, agora_voting::VotingError::DuplicateVote { .. }) {
                    state.metrics.duplicate_votes.inc();
                }
            })?;
        state.metrics.votes_submitted.inc();
        if submitted.broadcast == Broadcast::Failed {
            state.metrics.broadcast_failures.inc();
        }
        Ok(created(submitted.record))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitWithResidents {
    pub id: PropertyUnitId,
    pub number: String,
    pub residents: Vec<ResidentSummary>,
    /// Whether any resident of the unit has voted in this voting.
    pub has_voted: bool,
}

/// `GET /public/units-with-residents`
pub async fn units_with_residents(
    State(state): State<SharedState>,
    AuthenticatedVoter(claims): AuthenticatedVoter,
) -> ApiResult<impl IntoResponse> {
    voting_span("units_with_residents", claims.voting_id).in_scope(|| -> ApiResult<_> {
        let ledger = state.voting.ledger();
        let voters: HashSet<ResidentId> = ledger
            .list_votes(claims.voting_id)?
            .into_iter()
            .map(|v| v.resident_id)
            .collect();

        let mut units = ledger.list_property_units(claims.property_id)?;
        natural_unit_order(&mut units);
        let mut out = Vec::with_capacity(units.len());
        for unit in units {
            let residents = ledger.list_unit_residents(unit.id)?;
            let has_voted = residents.iter().any(|r| voters.contains(&r.id));
            out.push(UnitWithResidents {
                id: unit.id,
                number: unit.number,
                has_voted,
                residents: residents
                    .into_iter()
                    .filter(|r| r.is_active)
                    .map(|r| ResidentSummary {
                        id: r.id,
                        name: r.name,
                        is_main_resident: r.is_main_resident,
                    })
                    .collect(),
            });
        }
        Ok(ok(out))
    })
}

/// `GET /public/votes`
pub async fn votes(
    State(state): State<SharedState>,
    AuthenticatedVoter(claims): AuthenticatedVoter,
) -> ApiResult<impl IntoResponse> {
    voting_span("votes", claims.voting_id).in_scope(|| -> ApiResult<_> {
        let voting = state.voting.ledger().get_voting(claims.voting_id)?;
        let records = state.voting.current_votes(voting.id)?;
        Ok(ok(public_records(&voting, records)))
    })
}

/// `GET /public/voting-stream`
pub async fn voting_stream(
    State(state): State<SharedState>,
    AuthenticatedVoter(claims): AuthenticatedVoter,
) -> ApiResult<impl IntoResponse> {
    let span = stream_span(claims.voting_id, "public");
    let (voting, subscription) = span.in_scope(|| -> ApiResult<_> {
        let voting = state.voting.ledger().get_voting(claims.voting_id)?;
        let subscription = state.voting.subscribe(voting.id)?;
        Ok((voting, subscription))
    })?;
    Ok(vote_stream(
        subscription,
        state.settings.heartbeat,
        voting.is_secret,
        state.shutdown.subscribe(),
        Arc::clone(state.voting.clock()),
        ConnectionGuard::new(&state.metrics.sse_connections),
        span,
    ))
}
