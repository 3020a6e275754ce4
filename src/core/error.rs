//! Failure taxonomy for expense ingestion and mirroring.

use crate::store::StoreError;
use thiserror::Error;

/// Stable machine-readable codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    InternalError = 1,
    InvalidPayload = 2,
    InvalidPaymentMethod = 3,
    InvalidCategory = 4,
    InvalidSubcategory = 5,
    InvalidDate = 6,
    InvalidCurrency = 7,
    MirrorNotConfigured = 8,
    MirrorFailed = 9,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Terminal failures that leave nothing persisted.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Unparseable identifier, date or currency.
    #[error("validation error in field '{field}': {message}")]
    MalformedInput {
        field: &'static str,
        code: ErrorCode,
        message: String,
    },

    /// A name that does not exist in the owner's taxonomy.
    #[error("validation error in field '{field}': {message}")]
    UnresolvedReference {
        field: &'static str,
        code: ErrorCode,
        message: String,
    },

    #[error("exchange rate unavailable")]
    RateUnavailable(#[source] anyhow::Error),

    /// The store failed while resolving names, before anything was written.
    #[error("failed to look up expense references")]
    Lookup(#[source] StoreError),

    #[error("failed to persist expense")]
    Persistence(#[source] StoreError),
}

impl IngestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            IngestError::MalformedInput { code, .. } => *code,
            IngestError::UnresolvedReference { code, .. } => *code,
            IngestError::RateUnavailable(_)
            | IngestError::Lookup(_)
            | IngestError::Persistence(_) => ErrorCode::InternalError,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            IngestError::MalformedInput { field, .. }
            | IngestError::UnresolvedReference { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Internal faults are retryable and must not leak detail to callers.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            IngestError::RateUnavailable(_) | IngestError::Lookup(_) | IngestError::Persistence(_)
        )
    }
}

/// Failures of the best-effort mirror write. The expense is already saved.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("no valid mirror destination configured")]
    NotConfigured,

    #[error("expense {0} not found for mirroring")]
    MissingRecord(uuid::Uuid),

    #[error("failed to read mirror data")]
    Store(#[from] StoreError),

    #[error("failed to append row to destination")]
    Append(#[source] anyhow::Error),
}

impl MirrorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MirrorError::NotConfigured => ErrorCode::MirrorNotConfigured,
            _ => ErrorCode::MirrorFailed,
        }
    }
}
