//! API errors and their JSON envelope.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use agora_broadcast::BroadcastError;
use agora_crypto::TokenError;
use agora_store::StoreError;
use agora_voting::VotingError;

/// Every failure a request can end in.
///
/// The message of [`ApiError::Internal`] is logged and never sent to the
/// client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(detail) => error!(%status, detail = %detail, "request failed"),
            Self::Unauthorized(_) | Self::Forbidden(_) => {
                warn!(%status, message = %self, "request rejected")
            }
            _ => {}
        }
        let body = json!({ "success": false, "message": self.public_message() });
        (status, Json(body)).into_response()
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Malformed => Self::Unauthorized("malformed token".into()),
            TokenError::InvalidSignature => Self::Unauthorized("invalid token signature".into()),
            TokenError::Expired(_) => Self::Unauthorized("token expired".into()),
            TokenError::WrongScope { .. } => Self::Forbidden(e.to_string()),
            TokenError::InvalidDuration { .. } => Self::Validation(e.to_string()),
            TokenError::EmptySecret | TokenError::Signing(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(format!("not found: {what}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<VotingError> for ApiError {
    fn from(e: VotingError) -> Self {
        match e {
            VotingError::DuplicateVote { .. } => {
                Self::Conflict("resident has already voted in this voting".into())
            }
            VotingError::NotFound(what) => Self::NotFound(format!("not found: {what}")),
            VotingError::VotingInactive(_) => Self::Forbidden(e.to_string()),
            VotingError::InvalidOption { .. } => Self::Validation(e.to_string()),
            VotingError::Store(store) => store.into(),
            VotingError::Broadcast(broadcast) => broadcast.into(),
        }
    }
}

impl From<BroadcastError> for ApiError {
    fn from(e: BroadcastError) -> Self {
        match e {
            BroadcastError::Load { source, .. } => source.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("invalid query: {}", rejection.body_text()))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
