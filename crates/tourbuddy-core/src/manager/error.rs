use thiserror::Error;

use crate::models::ValidationError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ManagerError {
    /// A draft field failed local checks; the store was not contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport or backend failure. Retry by calling the same operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Record not found: {id}")]
    NotFound { id: String },

    #[error("Not signed in")]
    NotSignedIn,
}

impl ManagerError {
    /// Map a store error from an operation that targeted `id`.
    pub(crate) fn from_store(err: StoreError, id: &str) -> Self {
        if err.is_not_found() {
            ManagerError::NotFound { id: id.to_string() }
        } else {
            ManagerError::StoreUnavailable(err)
        }
    }

    /// Name of the failing field for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ManagerError::Validation(e) => Some(e.field),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ManagerError::StoreUnavailable(_))
    }
}

impl From<StoreError> for ManagerError {
    fn from(err: StoreError) -> Self {
        ManagerError::StoreUnavailable(err)
    }
}
