//! Best-effort copy of persisted expenses into an external ledger.

use crate::core::error::MirrorError;
use crate::core::expense::{DestinationRow, ExpenseSheetRow};
use crate::store::ExpenseStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The only destination kind currently supported.
pub const GOOGLE_SHEETS: &str = "google_sheets";

/// Addressing info for a spreadsheet destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsDestination {
    pub sheet_id: String,
    pub sheet_name: String,
}

impl SheetsDestination {
    /// Range rows are appended to.
    pub fn range(&self) -> String {
        format!("{}!A:A", self.sheet_name)
    }
}

/// Appends a single ordered row of scalar values to a destination.
#[async_trait]
pub trait RowAppender: Send + Sync {
    async fn append_row(&self, destination: &SheetsDestination, row: Vec<Value>) -> Result<()>;
}

/// Picks the first spreadsheet destination whose info decodes.
///
/// Only one destination is used even when several are configured.
pub fn select_destination(rows: &[DestinationRow]) -> Option<SheetsDestination> {
    for row in rows {
        if row.destination != GOOGLE_SHEETS {
            debug!(id = %row.id, kind = %row.destination, "Skipping unsupported destination");
            continue;
        }
        match serde_json::from_value::<SheetsDestination>(row.info.clone()) {
            Ok(destination) => return Some(destination),
            Err(e) => {
                warn!(id = %row.id, error = %e, "Skipping destination with malformed info");
            }
        }
    }
    None
}

/// Formats a persisted expense as a ledger row.
///
/// Columns: date, description, payment method, local amount, reference
/// amount, category, subcategory, creation timestamp, id.
pub fn format_row(expense: &ExpenseSheetRow, timezone: &FixedOffset) -> Vec<Value> {
    let created = expense.created_date.with_timezone(timezone);
    vec![
        json!(expense.date.format("%-d/%-m/%Y").to_string()),
        json!(expense.description),
        json!(expense.payment_method_name),
        json!(expense.ars_amount),
        json!(expense.usd_amount),
        json!(expense.category_name),
        json!(expense.subcategory_name.clone().unwrap_or_default()),
        json!(created.format("%-d/%-m/%Y %H:%M:%S").to_string()),
        json!(expense.id.to_string()),
    ]
}

#[derive(Clone)]
pub struct MirrorSync {
    store: Arc<dyn ExpenseStore>,
    appender: Arc<dyn RowAppender>,
    timezone: FixedOffset,
}

impl MirrorSync {
    pub fn new(
        store: Arc<dyn ExpenseStore>,
        appender: Arc<dyn RowAppender>,
        timezone: FixedOffset,
    ) -> Self {
        Self {
            store,
            appender,
            timezone,
        }
    }

    /// Copies an already persisted expense to the owner's destination.
    pub async fn mirror(&self, expense_id: Uuid, user_id: Uuid) -> Result<(), MirrorError> {
        let destinations = self.store.destinations(user_id).await?;
        let destination = select_destination(&destinations).ok_or(MirrorError::NotConfigured)?;

        let expense = self
            .store
            .sheet_row(expense_id)
            .await?
            .ok_or(MirrorError::MissingRecord(expense_id))?;

        let row = format_row(&expense, &self.timezone);
        debug!(?row, sheet = %destination.sheet_id, "Appending row");
        self.appender
            .append_row(&destination, row)
            .await
            .map_err(MirrorError::Append)?;

        info!(%expense_id, sheet = %destination.sheet_id, "Expense mirrored");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::expense::NewExpense;
    use crate::store::SqliteStore;
    use anyhow::anyhow;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Mutex;

    /// Records appended rows, optionally failing every append.
    #[derive(Default)]
    pub struct RecordingAppender {
        pub rows: Mutex<Vec<(SheetsDestination, Vec<Value>)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl RowAppender for RecordingAppender {
        async fn append_row(&self, destination: &SheetsDestination, row: Vec<Value>) -> Result<()> {
            if self.fail {
                return Err(anyhow!("quota exceeded"));
            }
            self.rows.lock().unwrap().push((destination.clone(), row));
            Ok(())
        }
    }

    fn destination_row(kind: &str, info: Value) -> DestinationRow {
        DestinationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            destination: kind.to_string(),
            info,
            created_date: Utc::now(),
        }
    }

    fn buenos_aires() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_select_destination_skips_malformed_and_unsupported() {
        let rows = vec![
            destination_row("email", json!({"to": "me@example.com"})),
            destination_row(GOOGLE_SHEETS, json!({"sheetId": 42})),
            destination_row(GOOGLE_SHEETS, json!({"sheetId": "abc", "sheetName": "Gastos"})),
            destination_row(GOOGLE_SHEETS, json!({"sheetId": "def", "sheetName": "Other"})),
        ];

        let selected = select_destination(&rows).unwrap();
        assert_eq!(selected.sheet_id, "abc");
        assert_eq!(selected.range(), "Gastos!A:A");
    }

    #[test]
    fn test_select_destination_none_configured() {
        assert!(select_destination(&[]).is_none());
        let rows = vec![destination_row(GOOGLE_SHEETS, json!({"sheetName": "x"}))];
        assert!(select_destination(&rows).is_none());
    }

    #[test]
    fn test_format_row_renders_local_time() {
        let expense = ExpenseSheetRow {
            id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            description: "Groceries".to_string(),
            payment_method_name: "Cash".to_string(),
            ars_amount: 1000.0,
            usd_amount: 1.0,
            category_name: "Food".to_string(),
            subcategory_name: None,
            created_date: Utc.with_ymd_and_hms(2024, 3, 6, 2, 30, 0).unwrap(),
        };

        let row = format_row(&expense, &buenos_aires());
        assert_eq!(row[0], json!("5/3/2024"));
        assert_eq!(row[3], json!(1000.0));
        assert_eq!(row[6], json!(""));
        assert_eq!(row[7], json!("5/3/2024 23:30:00"));
        assert_eq!(row[8], json!(Uuid::nil().to_string()));
    }

    async fn seeded_store() -> (Arc<SqliteStore>, Uuid, Uuid) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let user = Uuid::new_v4();
        let category = store.add_category(user, "Food").await.unwrap();
        let payment = store.add_payment_method(user, "Cash").await.unwrap();
        let record = store
            .insert_expense(&NewExpense {
                user_id: user,
                description: "Groceries".to_string(),
                payment_method_id: payment.id,
                ars_amount: 1000.0,
                usd_amount: 1.0,
                category_id: category.id,
                subcategory_id: None,
                recurrent_expense_id: None,
                date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            })
            .await
            .unwrap();
        (store, user, record.id)
    }

    #[tokio::test]
    async fn test_mirror_appends_joined_row() {
        let (store, user, id) = seeded_store().await;
        store
            .add_destination(user, GOOGLE_SHEETS, &json!({"sheetId": "abc", "sheetName": "Gastos"}))
            .await
            .unwrap();
        let appender = Arc::new(RecordingAppender::default());
        let mirror = MirrorSync::new(store, appender.clone(), buenos_aires());

        mirror.mirror(id, user).await.unwrap();

        let rows = appender.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.sheet_name, "Gastos");
        assert_eq!(rows[0].1[2], json!("Cash"));
        assert_eq!(rows[0].1[5], json!("Food"));
    }

    #[tokio::test]
    async fn test_mirror_without_destination_is_not_configured() {
        let (store, user, id) = seeded_store().await;
        let appender = Arc::new(RecordingAppender::default());
        let mirror = MirrorSync::new(store, appender.clone(), buenos_aires());

        let err = mirror.mirror(id, user).await.unwrap_err();
        assert!(matches!(err, MirrorError::NotConfigured));
        assert!(appender.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mirror_reports_append_failure() {
        let (store, user, id) = seeded_store().await;
        store
            .add_destination(user, GOOGLE_SHEETS, &json!({"sheetId": "abc", "sheetName": "Gastos"}))
            .await
            .unwrap();
        let appender = Arc::new(RecordingAppender {
            fail: true,
            ..Default::default()
        });
        let mirror = MirrorSync::new(store, appender, buenos_aires());

        let err = mirror.mirror(id, user).await.unwrap_err();
        assert!(matches!(err, MirrorError::Append(_)));
    }
}
