//! Path extraction with rejections in the API envelope.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Like [`Path`], but a bad segment becomes [`ApiError::Validation`].
pub struct IdPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(format!("invalid path: {}", e.body_text())))?;
        Ok(Self(value))
    }
}
