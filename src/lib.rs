pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::cli::taxonomy::TaxonomyAction;
use crate::core::config::AppConfig;
use crate::core::{
    CurrencyConverter, ExpenseReply, ExpenseSubmission, IngestionPipeline, MirrorSync, RateCache,
    ReferenceResolver,
};
use crate::providers::{bonds::BondPriceProvider, sheets::SheetsClient};
use crate::store::SqliteStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Add(ExpenseSubmission),
    Rate,
    List {
        owner: String,
        start: String,
        end: String,
    },
    Taxonomy {
        owner: String,
        action: TaxonomyAction,
    },
}

/// Long-lived collaborators wired from configuration.
pub struct App {
    pub rates: Arc<RateCache>,
    pub store: Arc<SqliteStore>,
    pub pipeline: IngestionPipeline,
}

impl App {
    /// Builds every collaborator. Fails if the first exchange rate fetch fails.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let bonds = &config.providers.bonds;
        let price_provider = Arc::new(BondPriceProvider::new(
            &bonds.base_url,
            &bonds.market,
            &bonds.asset_type,
            config.request_timeout(),
        )?);
        let rates = Arc::new(RateCache::connect(price_provider, config.rate_settings()).await?);

        let store = Arc::new(open_store(config)?);

        let sheets = Arc::new(SheetsClient::new(
            &config.providers.sheets.base_url,
            config.sheets_access_token(),
        )?);

        let pipeline = IngestionPipeline::new(
            ReferenceResolver::new(store.clone()),
            CurrencyConverter::new(Arc::clone(&rates)),
            store.clone(),
            MirrorSync::new(store.clone(), sheets, config.timezone()?),
        );

        Ok(App {
            rates,
            store,
            pipeline,
        })
    }
}

/// Opens the configured database, creating its directory on first use.
pub fn open_store(config: &AppConfig) -> Result<SqliteStore> {
    let db_path = config.database_path()?;
    debug!(path = %db_path.display(), "Opening expense database");
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Expense sync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    match command {
        AppCommand::Add(submission) => {
            let app = App::from_config(&config).await?;
            add_expense(&app, &submission).await.map(|_| ())
        }
        AppCommand::Rate => {
            let app = App::from_config(&config).await?;
            cli::rate::run(&app.rates).await.map(|_| ())
        }
        // Store-only commands; the price feed is not contacted.
        AppCommand::List { owner, start, end } => {
            let store = open_store(&config)?;
            cli::list::run(&store, &owner, &start, &end)
                .await
                .map(|_| ())
        }
        AppCommand::Taxonomy { owner, action } => {
            let store = Arc::new(open_store(&config)?);
            cli::taxonomy::run(store, &owner, action).await.map(|_| ())
        }
    }
}

pub async fn add_expense(app: &App, submission: &ExpenseSubmission) -> Result<ExpenseReply> {
    cli::add::run(app, submission).await
}
