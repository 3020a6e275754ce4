use super::{ExpenseStore, Result, StoreError};
use crate::core::expense::{
    Category, DestinationRow, ExpenseRecord, ExpenseSheetRow, NewExpense, PaymentMethod,
    RecurrentExpense, Subcategory,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS subcategory (
    id TEXT PRIMARY KEY,
    category_id TEXT NOT NULL REFERENCES category(id),
    name TEXT NOT NULL,
    name_key TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS payment_method (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS recurrent_expense (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS expense (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    description TEXT NOT NULL,
    payment_method_id TEXT NOT NULL REFERENCES payment_method(id),
    ars_amount REAL NOT NULL,
    usd_amount REAL NOT NULL,
    category_id TEXT NOT NULL REFERENCES category(id),
    subcategory_id TEXT REFERENCES subcategory(id),
    recurrent_expense_id TEXT REFERENCES recurrent_expense(id),
    date TEXT NOT NULL,
    created_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_category_key ON category(user_id, name_key);
CREATE INDEX IF NOT EXISTS idx_subcategory_key ON subcategory(category_id, name_key);
CREATE INDEX IF NOT EXISTS idx_payment_method_key ON payment_method(user_id, name_key);
CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);
CREATE TABLE IF NOT EXISTS user_expense_save (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    destination TEXT NOT NULL,
    info TEXT NOT NULL,
    created_date TEXT NOT NULL
);
"#;

const EXPENSE_COLUMNS: &str = "id, user_id, description, payment_method_id, ars_amount, \
     usd_amount, category_id, subcategory_id, recurrent_expense_id, date, created_date";

/// SQLite-backed [`ExpenseStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Opening expense database at {}", path.as_ref().display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn add_category(&self, user_id: Uuid, name: &str) -> Result<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        self.conn.lock().await.execute(
            "INSERT INTO category (id, user_id, name, name_key) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id.to_string(),
                user_id.to_string(),
                category.name,
                name_key(name)
            ],
        )?;
        Ok(category)
    }

    pub async fn add_subcategory(&self, category_id: Uuid, name: &str) -> Result<Subcategory> {
        let subcategory = Subcategory {
            id: Uuid::new_v4(),
            category_id,
            name: name.to_string(),
        };
        self.conn.lock().await.execute(
            "INSERT INTO subcategory (id, category_id, name, name_key) VALUES (?1, ?2, ?3, ?4)",
            params![
                subcategory.id.to_string(),
                category_id.to_string(),
                subcategory.name,
                name_key(name)
            ],
        )?;
        Ok(subcategory)
    }

    pub async fn add_payment_method(&self, user_id: Uuid, name: &str) -> Result<PaymentMethod> {
        let method = PaymentMethod {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        self.conn.lock().await.execute(
            "INSERT INTO payment_method (id, user_id, name, name_key) VALUES (?1, ?2, ?3, ?4)",
            params![
                method.id.to_string(),
                user_id.to_string(),
                method.name,
                name_key(name)
            ],
        )?;
        Ok(method)
    }

    pub async fn add_recurrent_expense(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<RecurrentExpense> {
        let recurrent = RecurrentExpense {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        self.conn.lock().await.execute(
            "INSERT INTO recurrent_expense (id, user_id, name, name_key) VALUES (?1, ?2, ?3, ?4)",
            params![
                recurrent.id.to_string(),
                user_id.to_string(),
                recurrent.name,
                name_key(name)
            ],
        )?;
        Ok(recurrent)
    }

    pub async fn add_destination(
        &self,
        user_id: Uuid,
        destination: &str,
        info: &serde_json::Value,
    ) -> Result<DestinationRow> {
        let row = DestinationRow {
            id: Uuid::new_v4(),
            user_id,
            destination: destination.to_string(),
            info: info.clone(),
            created_date: Utc::now(),
        };
        self.conn.lock().await.execute(
            "INSERT INTO user_expense_save (id, user_id, destination, info, created_date) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.id.to_string(),
                user_id.to_string(),
                row.destination,
                info.to_string(),
                row.created_date.to_rfc3339()
            ],
        )?;
        Ok(row)
    }

    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.lock().await.execute(sql, [])?)
    }
}

#[async_trait]
impl ExpenseStore for SqliteStore {
    async fn category_by_name(&self, user_id: Uuid, name: &str) -> Result<Option<Category>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, user_id, name FROM category \
                 WHERE user_id = ?1 AND name_key = ?2 LIMIT 1",
                params![user_id.to_string(), name_key(name)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, user_id, name)| {
            Ok(Category {
                id: parse_uuid("id", &id)?,
                user_id: parse_uuid("user_id", &user_id)?,
                name,
            })
        })
        .transpose()
    }

    async fn subcategory_by_name(
        &self,
        category_id: Uuid,
        name: &str,
    ) -> Result<Option<Subcategory>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, category_id, name FROM subcategory \
                 WHERE category_id = ?1 AND name_key = ?2 LIMIT 1",
                params![category_id.to_string(), name_key(name)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, category_id, name)| {
            Ok(Subcategory {
                id: parse_uuid("id", &id)?,
                category_id: parse_uuid("category_id", &category_id)?,
                name,
            })
        })
        .transpose()
    }

    async fn payment_method_by_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<PaymentMethod>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, user_id, name FROM payment_method \
                 WHERE user_id = ?1 AND name_key = ?2 LIMIT 1",
                params![user_id.to_string(), name_key(name)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, user_id, name)| {
            Ok(PaymentMethod {
                id: parse_uuid("id", &id)?,
                user_id: parse_uuid("user_id", &user_id)?,
                name,
            })
        })
        .transpose()
    }

    async fn recurrent_expense_by_id(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<RecurrentExpense>> {
        let conn = self.conn.lock().await;
        let name = conn
            .query_row(
                "SELECT name FROM recurrent_expense WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(name.map(|name| RecurrentExpense { id, user_id, name }))
    }

    async fn insert_expense(&self, expense: &NewExpense) -> Result<ExpenseRecord> {
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            user_id: expense.user_id,
            description: expense.description.clone(),
            payment_method_id: expense.payment_method_id,
            ars_amount: expense.ars_amount,
            usd_amount: expense.usd_amount,
            category_id: expense.category_id,
            subcategory_id: expense.subcategory_id,
            recurrent_expense_id: expense.recurrent_expense_id,
            date: expense.date,
            created_date: Utc::now(),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO expense ({EXPENSE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                record.id.to_string(),
                record.user_id.to_string(),
                record.description,
                record.payment_method_id.to_string(),
                record.ars_amount,
                record.usd_amount,
                record.category_id.to_string(),
                record.subcategory_id.map(|id| id.to_string()),
                record.recurrent_expense_id.map(|id| id.to_string()),
                record.date.format("%Y-%m-%d").to_string(),
                record.created_date.to_rfc3339(),
            ],
        )?;
        debug!(id = %record.id, "Inserted expense");
        Ok(record)
    }

    async fn expense_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<ExpenseRecord>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                &format!("SELECT {EXPENSE_COLUMNS} FROM expense WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id.to_string()],
                RawExpense::from_row,
            )
            .optional()?;
        raw.map(RawExpense::into_record).transpose()
    }

    async fn expenses_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense \
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date DESC, created_date DESC"
        ))?;
        let rows = stmt.query_map(
            params![
                user_id.to_string(),
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            RawExpense::from_row,
        )?;

        let mut expenses = Vec::new();
        for raw in rows {
            expenses.push(raw?.into_record()?);
        }
        Ok(expenses)
    }

    async fn sheet_row(&self, id: Uuid) -> Result<Option<ExpenseSheetRow>> {
        let conn = self.conn.lock().await;
        let raw = conn
            .query_row(
                "SELECT e.id, e.date, e.description, pm.name, e.ars_amount, e.usd_amount, \
                        c.name, sc.name, e.created_date \
                 FROM expense e \
                 JOIN payment_method pm ON pm.id = e.payment_method_id \
                 JOIN category c ON c.id = e.category_id \
                 LEFT JOIN subcategory sc ON sc.id = e.subcategory_id \
                 WHERE e.id = ?1 \
                 LIMIT 1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        raw.map(
            |(id, date, description, pm, ars, usd, category, subcategory, created)| {
                Ok(ExpenseSheetRow {
                    id: parse_uuid("id", &id)?,
                    date: parse_date("date", &date)?,
                    description,
                    payment_method_name: pm,
                    ars_amount: ars,
                    usd_amount: usd,
                    category_name: category,
                    subcategory_name: subcategory,
                    created_date: parse_timestamp("created_date", &created)?,
                })
            },
        )
        .transpose()
    }

    async fn destinations(&self, user_id: Uuid) -> Result<Vec<DestinationRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, destination, info, created_date FROM user_expense_save \
             WHERE user_id = ?1 ORDER BY created_date ASC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut destinations = Vec::new();
        for row in rows {
            let (id, user_id, destination, info, created) = row?;
            destinations.push(DestinationRow {
                id: parse_uuid("id", &id)?,
                user_id: parse_uuid("user_id", &user_id)?,
                destination,
                info: serde_json::from_str(&info).map_err(|e| StoreError::Corrupt {
                    column: "info",
                    message: e.to_string(),
                })?,
                created_date: parse_timestamp("created_date", &created)?,
            });
        }
        Ok(destinations)
    }

    async fn categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        let conn = self.conn.lock().await;
        let rows = query_named(
            &conn,
            "SELECT id, user_id, name FROM category WHERE user_id = ?1 ORDER BY name_key",
            &user_id,
        )?;
        rows.into_iter()
            .map(|(id, user_id, name)| {
                Ok(Category {
                    id: parse_uuid("id", &id)?,
                    user_id: parse_uuid("user_id", &user_id)?,
                    name,
                })
            })
            .collect()
    }

    async fn subcategories(&self, user_id: Uuid) -> Result<Vec<Subcategory>> {
        let conn = self.conn.lock().await;
        let rows = query_named(
            &conn,
            "SELECT sc.id, sc.category_id, sc.name FROM subcategory sc \
             JOIN category c ON c.id = sc.category_id \
             WHERE c.user_id = ?1 ORDER BY c.name_key, sc.name_key",
            &user_id,
        )?;
        rows.into_iter()
            .map(|(id, category_id, name)| {
                Ok(Subcategory {
                    id: parse_uuid("id", &id)?,
                    category_id: parse_uuid("category_id", &category_id)?,
                    name,
                })
            })
            .collect()
    }

    async fn payment_methods(&self, user_id: Uuid) -> Result<Vec<PaymentMethod>> {
        let conn = self.conn.lock().await;
        let rows = query_named(
            &conn,
            "SELECT id, user_id, name FROM payment_method WHERE user_id = ?1 ORDER BY name_key",
            &user_id,
        )?;
        rows.into_iter()
            .map(|(id, user_id, name)| {
                Ok(PaymentMethod {
                    id: parse_uuid("id", &id)?,
                    user_id: parse_uuid("user_id", &user_id)?,
                    name,
                })
            })
            .collect()
    }

    async fn recurrent_expenses(&self, user_id: Uuid) -> Result<Vec<RecurrentExpense>> {
        let conn = self.conn.lock().await;
        let rows = query_named(
            &conn,
            "SELECT id, user_id, name FROM recurrent_expense WHERE user_id = ?1 ORDER BY name_key",
            &user_id,
        )?;
        rows.into_iter()
            .map(|(id, user_id, name)| {
                Ok(RecurrentExpense {
                    id: parse_uuid("id", &id)?,
                    user_id: parse_uuid("user_id", &user_id)?,
                    name,
                })
            })
            .collect()
    }
}

/// Runs a query returning `(id, owner or parent id, name)` rows.
fn query_named(
    conn: &Connection,
    sql: &str,
    user_id: &Uuid,
) -> Result<Vec<(String, String, String)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}


// Column values as stored, decoded outside the rusqlite row callback.
struct RawExpense {
    id: String,
    user_id: String,
    description: String,
    payment_method_id: String,
    ars_amount: f64,
    usd_amount: f64,
    category_id: String,
    subcategory_id: Option<String>,
    recurrent_expense_id: Option<String>,
    date: String,
    created_date: String,
}

impl RawExpense {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            description: row.get(2)?,
            payment_method_id: row.get(3)?,
            ars_amount: row.get(4)?,
            usd_amount: row.get(5)?,
            category_id: row.get(6)?,
            subcategory_id: row.get(7)?,
            recurrent_expense_id: row.get(8)?,
            date: row.get(9)?,
            created_date: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<ExpenseRecord> {
        Ok(ExpenseRecord {
            id: parse_uuid("id", &self.id)?,
            user_id: parse_uuid("user_id", &self.user_id)?,
            description: self.description,
            payment_method_id: parse_uuid("payment_method_id", &self.payment_method_id)?,
            ars_amount: self.ars_amount,
            usd_amount: self.usd_amount,
            category_id: parse_uuid("category_id", &self.category_id)?,
            subcategory_id: self
                .subcategory_id
                .as_deref()
                .map(|id| parse_uuid("subcategory_id", id))
                .transpose()?,
            recurrent_expense_id: self
                .recurrent_expense_id
                .as_deref()
                .map(|id| parse_uuid("recurrent_expense_id", id))
                .transpose()?,
            date: parse_date("date", &self.date)?,
            created_date: parse_timestamp("created_date", &self.created_date)?,
        })
    }
}

// SQLite's LOWER only folds ASCII, so names are folded here instead.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid> {
    Uuid::from_str(value).map_err(|e| StoreError::Corrupt {
        column,
        message: e.to_string(),
    })
}

fn parse_date(column: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| StoreError::Corrupt {
        column,
        message: e.to_string(),
    })
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            column,
            message: e.to_string(),
        })
}
