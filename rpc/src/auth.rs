//! Request authentication: voting tokens and the admin key.
//!
//! Tokens travel as `Authorization: Bearer <token>`. Because browsers cannot
//! set headers on an `EventSource`, a `token` query parameter is accepted
//! too; the header wins when both are present.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use agora_crypto::{PublicVotingClaims, VotingAuthClaims};

use crate::error::ApiError;
use crate::state::SharedState;

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

fn query_token(parts: &Parts) -> Option<&str> {
    parts
        .uri
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value)
        .filter(|v| !v.is_empty())
}

fn presented_token(parts: &Parts) -> Result<&str, ApiError> {
    bearer(parts)
        .or_else(|| query_token(parts))
        .ok_or_else(|| ApiError::Unauthorized("missing token".into()))
}

/// A caller holding a valid public voting token.
pub struct PublicVoter(pub PublicVotingClaims);

#[async_trait]
impl FromRequestParts<SharedState> for PublicVoter {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)?;
        Ok(Self(state.tokens.validate_public_token(token)?))
    }
}

/// A resident holding a valid voting auth token.
pub struct AuthenticatedVoter(pub VotingAuthClaims);

#[async_trait]
impl FromRequestParts<SharedState> for AuthenticatedVoter {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)?;
        Ok(Self(state.tokens.validate_auth_token(token)?))
    }
}

/// A caller presenting the admin API key as a bearer token.
pub struct Admin;

#[async_trait]
impl FromRequestParts<SharedState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let key = presented_token(parts)?;
        if constant_time_eq(key.as_bytes(), state.settings.admin_api_key.as_bytes()) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized("invalid admin key".into()))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
