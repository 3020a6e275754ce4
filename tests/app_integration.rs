use expense_sync::core::ExpenseSubmission;
use expense_sync::core::config::AppConfig;
use expense_sync::core::error::ErrorCode;
use expense_sync::store::ExpenseStore;
use expense_sync::{App, TaxonomyAction, add_expense};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils {
    use super::*;

    /// Bond feed answering AL30 / AL30D with the given prices.
    pub async fn create_bond_mock_server(local: f64, reference: f64) -> MockServer {
        let mock_server = MockServer::start().await;
        for (ticker, value) in [("AL30", local), ("AL30D", reference)] {
            Mock::given(method("POST"))
                .and(path("/price"))
                .and(body_partial_json(json!({ "ticker": ticker })))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "value": value, "ticker": ticker })),
                )
                .mount(&mock_server)
                .await;
        }
        mock_server
    }

    pub fn write_config(
        dir: &TempDir,
        bonds_url: &str,
        sheets_url: &str,
    ) -> anyhow::Result<AppConfig> {
        let db_path = dir.path().join("data").join("expenses.db");
        let config_content = format!(
            r#"
database:
  path: "{}"
exchange_rate:
  ttl_minutes: 30
  request_timeout_secs: 2
providers:
  bonds:
    base_url: "{bonds_url}/price"
  sheets:
    base_url: "{sheets_url}"
    access_token: "test-token"
timezone_offset: "-03:00"
"#,
            db_path.display()
        );
        let config_path = dir.path().join("config.yaml");
        fs::write(&config_path, config_content)?;
        AppConfig::load_from_path(&config_path)
    }

    pub fn submission(owner: Uuid) -> ExpenseSubmission {
        ExpenseSubmission {
            user_id: owner.to_string(),
            description: "Groceries".to_string(),
            payment_method_name: "Visa".to_string(),
            category_name: "food".to_string(),
            subcategory_name: String::new(),
            amount: 1000.0,
            currency: "ARS".to_string(),
            date: "2024-03-15".to_string(),
            recurrent_expense_id: None,
        }
    }
}

async fn seed_taxonomy(app: &App, owner: Uuid) -> anyhow::Result<()> {
    app.store.add_category(owner, "Food").await?;
    app.store.add_payment_method(owner, "visa").await?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_add_expense_persists_and_mirrors() -> anyhow::Result<()> {
    let bonds = test_utils::create_bond_mock_server(1000.0, 1.0).await;
    let sheets = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values/Gastos!A:A:append"))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_partial_json(json!({
            "values": [["15/3/2024", "Groceries", "visa", 1000.0, 1.0, "Food", ""]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&sheets)
        .await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let app = App::from_config(&config).await?;
    assert_eq!(app.rates.get_rate().await?, 1000.0);

    let owner = Uuid::new_v4();
    seed_taxonomy(&app, owner).await?;
    app.store
        .add_destination(
            owner,
            "google_sheets",
            &json!({ "sheetId": "sheet-1", "sheetName": "Gastos" }),
        )
        .await?;

    let reply = add_expense(&app, &test_utils::submission(owner)).await?;
    info!(?reply, "Received reply");

    assert!(reply.success);
    assert_eq!(reply.code, ErrorCode::Success.as_i32());
    let id = reply.id.expect("reply carries the expense id");
    let stored = app.store.expense_by_id(id, owner).await?.expect("stored");
    assert_eq!(stored.ars_amount, 1000.0);
    assert_eq!(stored.usd_amount, 1.0);
    assert!(dir.path().join("data").join("expenses.db").exists());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_add_expense_without_destination_is_kept() -> anyhow::Result<()> {
    let bonds = test_utils::create_bond_mock_server(1000.0, 1.0).await;
    let sheets = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&sheets)
        .await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let app = App::from_config(&config).await?;
    let owner = Uuid::new_v4();
    seed_taxonomy(&app, owner).await?;

    let mut submission = test_utils::submission(owner);
    submission.amount = 5.0;
    submission.currency = "USD".to_string();
    let reply = add_expense(&app, &submission).await?;

    assert!(!reply.success);
    assert!(reply.persisted);
    assert_eq!(reply.code, ErrorCode::MirrorNotConfigured.as_i32());
    let stored = app
        .store
        .expense_by_id(reply.id.expect("id"), owner)
        .await?
        .expect("stored");
    assert_eq!(stored.ars_amount, 5000.0);
    assert_eq!(stored.usd_amount, 5.0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_add_expense_rejects_unknown_category() -> anyhow::Result<()> {
    let bonds = test_utils::create_bond_mock_server(1000.0, 1.0).await;
    let sheets = MockServer::start().await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let app = App::from_config(&config).await?;
    let owner = Uuid::new_v4();
    seed_taxonomy(&app, owner).await?;

    let mut submission = test_utils::submission(owner);
    submission.category_name = "Travel".to_string();
    let err = add_expense(&app, &submission).await.unwrap_err();

    assert!(err.to_string().contains("categoryName"), "{err}");
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    assert!(app.store.expenses_in_range(owner, start, end).await?.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_rate_command_reports_cached_rate() -> anyhow::Result<()> {
    let bonds = test_utils::create_bond_mock_server(1250.0, 1.0).await;
    let sheets = MockServer::start().await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let app = App::from_config(&config).await?;

    let rate = expense_sync::cli::rate::run(&app.rates).await?;
    assert_eq!(rate, 1250.0);
    // only the startup fetch hit the feed
    assert_eq!(bonds.received_requests().await.map_or(0, |r| r.len()), 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_startup_fails_when_price_feed_is_down() -> anyhow::Result<()> {
    let bonds = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&bonds)
        .await;
    let sheets = MockServer::start().await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let err = App::from_config(&config).await.err().expect("startup must fail");

    assert!(format!("{err:#}").contains("non-200"), "{err:#}");
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_list_command_works_without_price_feed() -> anyhow::Result<()> {
    let bonds = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(0)
        .mount(&bonds)
        .await;
    let sheets = MockServer::start().await;

    let dir = TempDir::new()?;
    test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let config_path = dir.path().join("config.yaml");

    expense_sync::run_command(
        expense_sync::AppCommand::List {
            owner: Uuid::new_v4().to_string(),
            start: "2024-03-01".to_string(),
            end: "2024-03-31".to_string(),
        },
        config_path.to_str(),
    )
    .await?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_taxonomy_commands_provision_what_add_needs() -> anyhow::Result<()> {
    let bonds = test_utils::create_bond_mock_server(1000.0, 1.0).await;
    let sheets = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-9/values/Gastos!A:A:append"))
        .and(body_partial_json(json!({
            "values": [["15/3/2024", "Groceries", "Débito", 1000.0, 1.0, "Almacén", "Verdulería"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&sheets)
        .await;

    let dir = TempDir::new()?;
    let config = test_utils::write_config(&dir, &bonds.uri(), &sheets.uri())?;
    let config_path = dir.path().join("config.yaml");
    let owner = Uuid::new_v4();

    for action in [
        TaxonomyAction::AddCategory {
            name: "Almacén".to_string(),
        },
        TaxonomyAction::AddSubcategory {
            category: "almacén".to_string(),
            name: "Verdulería".to_string(),
        },
        TaxonomyAction::AddPaymentMethod {
            name: "Débito".to_string(),
        },
        TaxonomyAction::AddSheet {
            sheet_id: "sheet-9".to_string(),
            sheet_name: "Gastos".to_string(),
        },
        TaxonomyAction::Show,
    ] {
        expense_sync::run_command(
            expense_sync::AppCommand::Taxonomy {
                owner: owner.to_string(),
                action,
            },
            config_path.to_str(),
        )
        .await?;
    }

    let app = App::from_config(&config).await?;
    let mut submission = test_utils::submission(owner);
    submission.category_name = "ALMACÉN".to_string();
    submission.subcategory_name = "VERDULERÍA".to_string();
    submission.payment_method_name = "DÉBITO".to_string();
    let reply = add_expense(&app, &submission).await?;

    assert!(reply.success, "{reply:?}");
    assert_eq!(reply.code, ErrorCode::Success.as_i32());
    Ok(())
}
