//! Scope-limited voting tokens for the Agora voting engine.
//!
//! Two token kinds let an anonymous resident reach the ballot without a full
//! login:
//! - **Public voting token** (PVT): shared by QR code or link, scoped to one
//!   voting; grants identity validation and read-only endpoints.
//! - **Voting auth token** (VAT): issued after the resident proves identity,
//!   bound to that resident, valid for two hours; grants the vote itself.
//!
//! Tokens are `hex(claims JSON) "." hex(HMAC-SHA256)`. The scope lives inside
//! the signed claims as a closed enum, so a token of one kind can never be
//! decoded as the other.

pub mod claims;
pub mod error;
pub mod sign;
pub mod token;

pub use claims::{PublicVotingClaims, TokenClaims, TokenScope, VotingAuthClaims};
pub use error::TokenError;
pub use sign::{sign_payload, verify_payload};
pub use token::{TokenAuthority, AUTH_TOKEN_TTL_SECS, MAX_PUBLIC_TOKEN_HOURS};
