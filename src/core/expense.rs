//! Expense data model shared by the store, the pipeline and the mirror.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A submission as received from a client, before any validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSubmission {
    pub user_id: String,
    pub description: String,
    pub payment_method_name: String,
    pub category_name: String,
    #[serde(default)]
    pub subcategory_name: String,
    pub amount: f64,
    pub currency: String,
    pub date: String,
    #[serde(default)]
    pub recurrent_expense_id: Option<String>,
}

/// A validated expense ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub user_id: Uuid,
    pub description: String,
    pub payment_method_id: Uuid,
    pub ars_amount: f64,
    pub usd_amount: f64,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub recurrent_expense_id: Option<Uuid>,
    pub date: NaiveDate,
}

/// A persisted expense with its system-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub payment_method_id: Uuid,
    pub ars_amount: f64,
    pub usd_amount: f64,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub recurrent_expense_id: Option<Uuid>,
    pub date: NaiveDate,
    pub created_date: DateTime<Utc>,
}

/// Display projection of an expense, joined with taxonomy names.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSheetRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub payment_method_name: String,
    pub ars_amount: f64,
    pub usd_amount: f64,
    pub category_name: String,
    pub subcategory_name: Option<String>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentExpense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

/// Everything an owner can reference when submitting an expense.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub payment_methods: Vec<PaymentMethod>,
    pub recurrent_expenses: Vec<RecurrentExpense>,
}

impl Taxonomy {
    /// Subcategories whose parent is `category_id`.
    pub fn subcategories_of(&self, category_id: Uuid) -> impl Iterator<Item = &Subcategory> {
        self.subcategories
            .iter()
            .filter(move |s| s.category_id == category_id)
    }
}

/// What a resolved name was looked up within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceScope {
    Owner(Uuid),
    Category(Uuid),
}

/// A free-text name resolved to its storage identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalReference {
    pub id: Uuid,
    pub name: String,
    pub scope: ReferenceScope,
}

impl From<Category> for CanonicalReference {
    fn from(c: Category) -> Self {
        CanonicalReference {
            id: c.id,
            name: c.name,
            scope: ReferenceScope::Owner(c.user_id),
        }
    }
}

impl From<Subcategory> for CanonicalReference {
    fn from(s: Subcategory) -> Self {
        CanonicalReference {
            id: s.id,
            name: s.name,
            scope: ReferenceScope::Category(s.category_id),
        }
    }
}

impl From<PaymentMethod> for CanonicalReference {
    fn from(p: PaymentMethod) -> Self {
        CanonicalReference {
            id: p.id,
            name: p.name,
            scope: ReferenceScope::Owner(p.user_id),
        }
    }
}

impl From<RecurrentExpense> for CanonicalReference {
    fn from(r: RecurrentExpense) -> Self {
        CanonicalReference {
            id: r.id,
            name: r.name,
            scope: ReferenceScope::Owner(r.user_id),
        }
    }
}

/// A stored mirror destination. `info` is decoded lazily per kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub destination: String,
    pub info: serde_json::Value,
    pub created_date: DateTime<Utc>,
}
