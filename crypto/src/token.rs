//! Token issuance and validation.

use std::fmt;
use std::sync::Arc;

use agora_types::{BusinessId, Clock, ResidentId, SystemClock, VotingGroupId, VotingId};

use crate::claims::{PublicVotingClaims, TokenClaims, TokenScope, VotingAuthClaims};
use crate::sign::{sign_payload, verify_payload};
use crate::TokenError;

/// Lifetime of a voting auth token. Fixed: it grants the power to vote.
pub const AUTH_TOKEN_TTL_SECS: u64 = 2 * 60 * 60;

/// Upper bound on the admin-chosen lifetime of a public voting token.
pub const MAX_PUBLIC_TOKEN_HOURS: u32 = 24 * 30;

const SEPARATOR: char = '.';

/// Issues and validates voting tokens with a server-held secret.
///
/// Stateless apart from the secret: no token is ever stored.
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Arc<[u8]>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority").finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Create an authority reading time from the system clock.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: impl AsRef<[u8]>, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self {
            secret: Arc::from(secret),
            clock,
        })
    }

    /// Issue a public voting token valid for `duration_hours`.
    pub fn issue_public_token(
        &self,
        voting_id: VotingId,
        voting_group_id: VotingGroupId,
        property_id: BusinessId,
        duration_hours: u32,
    ) -> Result<String, TokenError> {
        if duration_hours == 0 || duration_hours > MAX_PUBLIC_TOKEN_HOURS {
            return Err(TokenError::InvalidDuration {
                got: duration_hours,
                max: MAX_PUBLIC_TOKEN_HOURS,
            });
        }
        let now = self.clock.now();
        let claims = TokenClaims::PublicVoting(PublicVotingClaims {
            voting_id,
            voting_group_id,
            property_id,
            issued_at: now,
            expires_at: now.plus_secs(u64::from(duration_hours) * 3600),
        });
        self.encode(&claims)
    }

    pub fn validate_public_token(&self, token: &str) -> Result<PublicVotingClaims, TokenError> {
        match self.decode(token)? {
            TokenClaims::PublicVoting(claims) => Ok(claims),
            other => Err(TokenError::WrongScope {
                expected: TokenScope::PublicVoting,
                found: other.scope(),
            }),
        }
    }

    /// Issue a voting auth token for a resident who proved their identity.
    pub fn issue_auth_token(
        &self,
        resident_id: ResidentId,
        voting_id: VotingId,
        voting_group_id: VotingGroupId,
        property_id: BusinessId,
    ) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = TokenClaims::VotingAuth(VotingAuthClaims {
            resident_id,
            voting_id,
            voting_group_id,
            property_id,
            issued_at: now,
            expires_at: now.plus_secs(AUTH_TOKEN_TTL_SECS),
        });
        self.encode(&claims)
    }

    pub fn validate_auth_token(&self, token: &str) -> Result<VotingAuthClaims, TokenError> {
        match self.decode(token)? {
            TokenClaims::VotingAuth(claims) => Ok(claims),
            other => Err(TokenError::WrongScope {
                expected: TokenScope::VotingAuth,
                found: other.scope(),
            }),
        }
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
        let payload = hex::encode(json);
        let signature = sign_payload(&self.secret, payload.as_bytes())?;
        Ok(format!("{payload}{SEPARATOR}{}", hex::encode(signature)))
    }

    /// Verify signature, then decode, then check expiry. Scope is left to
    /// the caller so it can report which kind it actually got.
    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (payload, signature) = token
            .trim()
            .split_once(SEPARATOR)
            .ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;
        if !verify_payload(&self.secret, payload.as_bytes(), &signature) {
            return Err(TokenError::InvalidSignature);
        }

        let json = hex::decode(payload).map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims = serde_json::from_slice(&json).map_err(|e| {
            tracing::debug!(error = %e, "signed token carries undecodable claims");
            TokenError::Malformed
        })?;

        let expires_at = claims.expires_at();
        if expires_at.is_past(self.clock.now()) {
            return Err(TokenError::Expired(expires_at));
        }
        Ok(claims)
    }
}
