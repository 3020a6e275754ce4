use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use expense_sync::TaxonomyAction;
use expense_sync::core::ExpenseSubmission;
use expense_sync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the current exchange rate
    Rate,
    /// Record an expense and mirror it to the owner's spreadsheet
    Add(AddArgs),
    /// List an owner's expenses within a date range
    List {
        /// Owner id (UUID)
        #[arg(long)]
        owner: String,
        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },
    /// Show or add the names and spreadsheet an owner submits against
    Taxonomy {
        /// Owner id (UUID)
        #[arg(long)]
        owner: String,
        #[command(subcommand)]
        action: TaxonomyCommand,
    },
}

#[derive(Subcommand)]
enum TaxonomyCommand {
    /// List categories, subcategories, payment methods and recurrent expenses
    Show,
    AddCategory {
        #[arg(long)]
        name: String,
    },
    AddSubcategory {
        /// Parent category name
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: String,
    },
    AddPaymentMethod {
        #[arg(long)]
        name: String,
    },
    AddRecurrentExpense {
        #[arg(long)]
        name: String,
    },
    /// Mirror this owner's expenses to a Google Sheet
    AddSheet {
        /// Spreadsheet id from its URL
        #[arg(long)]
        sheet_id: String,
        /// Tab rows are appended to
        #[arg(long)]
        sheet_name: String,
    },
}

impl From<TaxonomyCommand> for TaxonomyAction {
    fn from(cmd: TaxonomyCommand) -> Self {
        match cmd {
            TaxonomyCommand::Show => TaxonomyAction::Show,
            TaxonomyCommand::AddCategory { name } => TaxonomyAction::AddCategory { name },
            TaxonomyCommand::AddSubcategory { category, name } => {
                TaxonomyAction::AddSubcategory { category, name }
            }
            TaxonomyCommand::AddPaymentMethod { name } => TaxonomyAction::AddPaymentMethod { name },
            TaxonomyCommand::AddRecurrentExpense { name } => {
                TaxonomyAction::AddRecurrentExpense { name }
            }
            TaxonomyCommand::AddSheet {
                sheet_id,
                sheet_name,
            } => TaxonomyAction::AddSheet {
                sheet_id,
                sheet_name,
            },
        }
    }
}

#[derive(Args)]
struct AddArgs {
    /// Owner id (UUID)
    #[arg(long)]
    owner: String,
    #[arg(long)]
    description: String,
    /// Payment method name, matched case-insensitively
    #[arg(long)]
    payment_method: String,
    /// Category name, matched case-insensitively
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    subcategory: String,
    #[arg(long, allow_negative_numbers = true)]
    amount: f64,
    /// ARS or USD
    #[arg(long)]
    currency: String,
    /// Expense date as YYYY-MM-DD
    #[arg(long)]
    date: String,
    /// Recurrent expense id (UUID) to link
    #[arg(long)]
    recurrent_expense: Option<String>,
}

impl From<AddArgs> for ExpenseSubmission {
    fn from(args: AddArgs) -> Self {
        ExpenseSubmission {
            user_id: args.owner,
            description: args.description,
            payment_method_name: args.payment_method,
            category_name: args.category,
            subcategory_name: args.subcategory,
            amount: args.amount,
            currency: args.currency,
            date: args.date,
            recurrent_expense_id: args.recurrent_expense,
        }
    }
}

impl From<Commands> for expense_sync::AppCommand {
    fn from(cmd: Commands) -> expense_sync::AppCommand {
        match cmd {
            Commands::Rate => expense_sync::AppCommand::Rate,
            Commands::Add(args) => expense_sync::AppCommand::Add(args.into()),
            Commands::List { owner, from, to } => expense_sync::AppCommand::List {
                owner,
                start: from,
                end: to,
            },
            Commands::Taxonomy { owner, action } => expense_sync::AppCommand::Taxonomy {
                owner,
                action: action.into(),
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => expense_sync::cli::setup::setup_at_path(path),
            None => expense_sync::cli::setup::setup(),
        },
        Some(cmd) => expense_sync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
