use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Turns a `NotFound` lookup into `Ok(None)`, keeping every other error.
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, StoreError> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_maps_only_not_found() {
        let found: Result<u8, StoreError> = Ok(1);
        assert_eq!(found.optional().unwrap(), Some(1));

        let missing: Result<u8, StoreError> = Err(StoreError::NotFound("x".into()));
        assert_eq!(missing.optional().unwrap(), None);

        let broken: Result<u8, StoreError> = Err(StoreError::Backend("down".into()));
        assert!(matches!(broken.optional(), Err(StoreError::Backend(_))));
    }
}
