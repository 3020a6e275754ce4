pub mod sqlite;

use crate::core::expense::{
    Category, DestinationRow, ExpenseRecord, ExpenseSheetRow, NewExpense, PaymentMethod,
    RecurrentExpense, Subcategory,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("corrupt value in column '{column}': {message}")]
    Corrupt { column: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Relational storage for the expense taxonomy, expenses and mirror settings.
///
/// Lookups return `Ok(None)` when no row matches; `Err` is reserved for
/// backend faults. Name lookups are case-insensitive exact matches.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn category_by_name(&self, user_id: Uuid, name: &str) -> Result<Option<Category>>;

    async fn subcategory_by_name(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<Option<Subcategory>>;

    async fn payment_method_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<PaymentMethod>>;

    async fn recurrent_expense_by_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<RecurrentExpense>>;

    /// Inserts the expense, assigning its identifier and creation timestamp.
    async fn insert_expense(&self, expense: &NewExpense) -> Result<ExpenseRecord>;

    async fn expense_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<ExpenseRecord>>;

    /// Expenses dated within `[start, end]`, newest first.
    async fn expenses_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>>;

    async fn sheet_row(&self, id: Uuid) -> Result<Option<ExpenseSheetRow>>;

    async fn destinations(&self, user_id: Uuid) -> Result<Vec<DestinationRow>>;

    /// Listings below are ordered by name, ignoring case.
    async fn categories(&self, user_id: Uuid) -> Result<Vec<Category>>;

    /// Subcategories of every category the owner has.
    async fn subcategories(&self, user_id: Uuid) -> Result<Vec<Subcategory>>;

    async fn payment_methods(&self, user_id: Uuid) -> Result<Vec<PaymentMethod>>;

    async fn recurrent_expenses(&self, user_id: Uuid) -> Result<Vec<RecurrentExpense>>;
}
