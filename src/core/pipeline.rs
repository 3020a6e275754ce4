//! Validates, converts, persists and mirrors a single expense submission.
//!
//! The persistence write and the mirror write are separate operations with no
//! shared transaction. Once the expense is stored it stays stored; a failed
//! mirror is reported alongside the saved record instead of as a failure to
//! save, so callers do not resubmit and duplicate it.

use crate::core::currency::{ConvertedAmount, CurrencyConverter};
use crate::core::error::{ErrorCode, IngestError, MirrorError};
use crate::core::expense::{ExpenseRecord, ExpenseSubmission, NewExpense};
use crate::core::mirror::MirrorSync;
use crate::core::resolver::ReferenceResolver;
use crate::store::ExpenseStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of a submission that got past validation and was persisted.
#[derive(Debug)]
pub enum IngestOutcome {
    Mirrored(ExpenseRecord),
    /// Saved, but the mirror write failed. Must not be retried as a new submission.
    PersistedNotMirrored {
        expense: ExpenseRecord,
        error: MirrorError,
    },
}

impl IngestOutcome {
    pub fn expense(&self) -> &ExpenseRecord {
        match self {
            IngestOutcome::Mirrored(expense) => expense,
            IngestOutcome::PersistedNotMirrored { expense, .. } => expense,
        }
    }

    pub fn mirror_error(&self) -> Option<&MirrorError> {
        match self {
            IngestOutcome::Mirrored(_) => None,
            IngestOutcome::PersistedNotMirrored { error, .. } => Some(error),
        }
    }
}

/// Client-facing response for a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReply {
    pub success: bool,
    /// Whether the expense was saved, regardless of `success`.
    pub persisted: bool,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl From<&Result<IngestOutcome, IngestError>> for ExpenseReply {
    fn from(result: &Result<IngestOutcome, IngestError>) -> Self {
        match result {
            Ok(IngestOutcome::Mirrored(expense)) => ExpenseReply {
                success: true,
                persisted: true,
                code: ErrorCode::Success.as_i32(),
                field: None,
                message: "Expense saved".to_string(),
                id: Some(expense.id),
            },
            Ok(IngestOutcome::PersistedNotMirrored { expense, error }) => ExpenseReply {
                success: false,
                persisted: true,
                code: error.code().as_i32(),
                field: None,
                message: format!("Expense saved but not mirrored: {error}"),
                id: Some(expense.id),
            },
            Err(e) if e.is_internal() => ExpenseReply {
                success: false,
                persisted: false,
                code: e.code().as_i32(),
                field: None,
                message: "internal error".to_string(),
                id: None,
            },
            Err(e) => ExpenseReply {
                success: false,
                persisted: false,
                code: e.code().as_i32(),
                field: e.field().map(str::to_string),
                message: e.to_string(),
                id: None,
            },
        }
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    resolver: ReferenceResolver,
    converter: CurrencyConverter,
    store: Arc<dyn ExpenseStore>,
    mirror: MirrorSync,
}

impl IngestionPipeline {
    pub fn new(
        resolver: ReferenceResolver,
        converter: CurrencyConverter,
        store: Arc<dyn ExpenseStore>,
        mirror: MirrorSync,
    ) -> Self {
        Self {
            resolver,
            converter,
            store,
            mirror,
        }
    }

    #[instrument(
        name = "IngestExpense",
        skip_all,
        fields(user_id = %submission.user_id)
    )]
    pub async fn ingest(&self, submission: &ExpenseSubmission) -> Result<IngestOutcome, IngestError> {
        let expense = self.validate(submission).await.inspect_err(log_failure)?;

        let record = self
            .store
            .insert_expense(&expense)
            .await
            .map_err(IngestError::Persistence)
            .inspect_err(log_failure)?;
        info!(id = %record.id, "Expense persisted");

        match self.mirror.mirror(record.id, record.user_id).await {
            Ok(()) => Ok(IngestOutcome::Mirrored(record)),
            Err(error) => {
                warn!(id = %record.id, error = %error, "Expense persisted but mirror failed");
                Ok(IngestOutcome::PersistedNotMirrored {
                    expense: record,
                    error,
                })
            }
        }
    }

    /// Turns a submission into an insertable expense without writing anything.
    pub async fn validate(&self, submission: &ExpenseSubmission) -> Result<NewExpense, IngestError> {
        let user_id = parse_uuid("userId", &submission.user_id)?;

        let payment_method = self
            .resolver
            .payment_method(user_id, &submission.payment_method_name)
            .await
            .map_err(IngestError::Lookup)?
            .ok_or_else(|| IngestError::UnresolvedReference {
                field: "paymentMethodName",
                code: ErrorCode::InvalidPaymentMethod,
                message: format!(
                    "payment method '{}' not found for user",
                    submission.payment_method_name
                ),
            })?;

        let category = self
            .resolver
            .category(user_id, &submission.category_name)
            .await
            .map_err(IngestError::Lookup)?
            .ok_or_else(|| IngestError::UnresolvedReference {
                field: "categoryName",
                code: ErrorCode::InvalidCategory,
                message: format!("category '{}' not found for user", submission.category_name),
            })?;

        let subcategory_id = if submission.subcategory_name.is_empty() {
            None
        } else {
            let subcategory = self
                .resolver
                .subcategory(category.id, &submission.subcategory_name)
                .await
                .map_err(IngestError::Lookup)?
                .ok_or_else(|| IngestError::UnresolvedReference {
                    field: "subcategoryName",
                    code: ErrorCode::InvalidSubcategory,
                    message: format!(
                        "subcategory '{}' not found for category '{}'",
                        submission.subcategory_name, submission.category_name
                    ),
                })?;
            Some(subcategory.id)
        };

        let recurrent_expense_id = match submission.recurrent_expense_id.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let id = parse_uuid("recurrentExpenseId", raw)?;
                let recurrent = self
                    .resolver
                    .recurrent_expense(user_id, id)
                    .await
                    .map_err(IngestError::Lookup)?
                    .ok_or_else(|| IngestError::UnresolvedReference {
                        field: "recurrentExpenseId",
                        code: ErrorCode::InvalidPayload,
                        message: format!("recurrent expense '{raw}' not found for user"),
                    })?;
                Some(recurrent.id)
            }
        };

        let date = parse_date(&submission.date)?;
        let amount = check_amount(submission.amount)?;

        let ConvertedAmount { local, reference } = self
            .converter
            .convert(amount, &submission.currency)
            .await?;

        Ok(NewExpense {
            user_id,
            description: submission.description.clone(),
            payment_method_id: payment_method.id,
            ars_amount: local,
            usd_amount: reference,
            category_id: category.id,
            subcategory_id,
            recurrent_expense_id,
            date,
        })
    }
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, IngestError> {
    Uuid::parse_str(value.trim()).map_err(|_| IngestError::MalformedInput {
        field,
        code: ErrorCode::InvalidPayload,
        message: format!("invalid identifier: '{value}'"),
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, IngestError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        // chrono accepts unpadded fields; require exactly YYYY-MM-DD.
        .filter(|_| value.len() == 10)
        .ok_or_else(|| IngestError::MalformedInput {
            field: "date",
            code: ErrorCode::InvalidDate,
            message: format!("invalid date format, expected YYYY-MM-DD found {value}"),
        })
}

fn check_amount(amount: f64) -> Result<f64, IngestError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(IngestError::MalformedInput {
            field: "amount",
            code: ErrorCode::InvalidPayload,
            message: format!("amount must be a finite number >= 0, found {amount}"),
        })
    }
}

fn log_failure(e: &IngestError) {
    if e.is_internal() {
        error!(error = ?e, "Expense ingestion failed");
    } else {
        info!(code = e.code().as_i32(), field = e.field(), "Expense rejected: {e}");
    }
}
