use super::ui;
use crate::core::ReferenceResolver;
use crate::core::expense::Taxonomy;
use crate::core::mirror::{GOOGLE_SHEETS, SheetsDestination, select_destination};
use crate::store::{ExpenseStore, SqliteStore};
use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color};
use std::sync::Arc;
use uuid::Uuid;

/// Provisioning and listing of the names an owner submits expenses against.
pub enum TaxonomyAction {
    Show,
    AddCategory {
        name: String,
    },
    AddSubcategory {
        category: String,
        name: String,
    },
    AddPaymentMethod {
        name: String,
    },
    AddRecurrentExpense {
        name: String,
    },
    AddSheet {
        sheet_id: String,
        sheet_name: String,
    },
}

/// Applies `action` for `owner` and returns the owner's taxonomy afterwards.
pub async fn run(
    store: Arc<SqliteStore>,
    owner: &str,
    action: TaxonomyAction,
) -> Result<Taxonomy> {
    let owner = Uuid::parse_str(owner).with_context(|| format!("Invalid owner id: {owner}"))?;
    let resolver = ReferenceResolver::new(store.clone());

    let added = match action {
        TaxonomyAction::Show => {
            let taxonomy = resolver.taxonomy(owner).await?;
            let sheet = select_destination(&store.destinations(owner).await?);
            println!("{}", display_taxonomy(&taxonomy, sheet.as_ref()));
            return Ok(taxonomy);
        }
        TaxonomyAction::AddCategory { name } => {
            let name = required_name(&name)?;
            if resolver.category(owner, name).await?.is_some() {
                bail!("Category '{name}' already exists");
            }
            ("category", store.add_category(owner, name).await?.id)
        }
        TaxonomyAction::AddSubcategory { category, name } => {
            let name = required_name(&name)?;
            let Some(parent) = resolver.category(owner, &category).await? else {
                bail!("Category '{category}' not found");
            };
            if resolver.subcategory(parent.id, name).await?.is_some() {
                bail!("Subcategory '{name}' already exists under '{}'", parent.name);
            }
            ("subcategory", store.add_subcategory(parent.id, name).await?.id)
        }
        TaxonomyAction::AddPaymentMethod { name } => {
            let name = required_name(&name)?;
            if resolver.payment_method(owner, name).await?.is_some() {
                bail!("Payment method '{name}' already exists");
            }
            ("payment method", store.add_payment_method(owner, name).await?.id)
        }
        TaxonomyAction::AddRecurrentExpense { name } => {
            let name = required_name(&name)?;
            let existing = store.recurrent_expenses(owner).await?;
            if existing
                .iter()
                .any(|r| r.name.to_lowercase() == name.to_lowercase())
            {
                bail!("Recurrent expense '{name}' already exists");
            }
            (
                "recurrent expense",
                store.add_recurrent_expense(owner, name).await?.id,
            )
        }
        TaxonomyAction::AddSheet {
            sheet_id,
            sheet_name,
        } => {
            // The mirror only writes to the first valid destination.
            if let Some(current) = select_destination(&store.destinations(owner).await?) {
                bail!(
                    "A spreadsheet is already configured: {} ({})",
                    current.sheet_id,
                    current.sheet_name
                );
            }
            let destination = SheetsDestination {
                sheet_id: required_name(&sheet_id)?.to_string(),
                sheet_name: required_name(&sheet_name)?.to_string(),
            };
            let info = serde_json::to_value(&destination)?;
            ("spreadsheet", store.add_destination(owner, GOOGLE_SHEETS, &info).await?.id)
        }
    };

    let (kind, id) = added;
    println!(
        "{} {kind} {}",
        ui::style_text("Added", ui::StyleType::Success),
        ui::style_text(&id.to_string(), ui::StyleType::Subtle)
    );
    Ok(resolver.taxonomy(owner).await?)
}

fn required_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Name cannot be empty");
    }
    Ok(name)
}

fn display_taxonomy(taxonomy: &Taxonomy, sheet: Option<&SheetsDestination>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::label_cell("Kind"),
        ui::label_cell("Name"),
        ui::label_cell("ID"),
    ]);

    for category in &taxonomy.categories {
        table.add_row(vec![
            Cell::new("Category"),
            Cell::new(&category.name),
            Cell::new(category.id).fg(Color::DarkGrey),
        ]);
        for subcategory in taxonomy.subcategories_of(category.id) {
            table.add_row(vec![
                Cell::new("Subcategory"),
                Cell::new(format!("  └ {}", subcategory.name)),
                Cell::new(subcategory.id).fg(Color::DarkGrey),
            ]);
        }
    }
    for method in &taxonomy.payment_methods {
        table.add_row(vec![
            Cell::new("Payment method"),
            Cell::new(&method.name),
            Cell::new(method.id).fg(Color::DarkGrey),
        ]);
    }
    for recurrent in &taxonomy.recurrent_expenses {
        table.add_row(vec![
            Cell::new("Recurrent expense"),
            Cell::new(&recurrent.name),
            Cell::new(recurrent.id).fg(Color::DarkGrey),
        ]);
    }

    let sheet_line = match sheet {
        Some(sheet) => format!("Spreadsheet: {} ({})", sheet.sheet_id, sheet.sheet_name),
        None => ui::style_text("No spreadsheet configured", ui::StyleType::Warning),
    };

    format!(
        "{}\n\n{}\n{}",
        ui::style_text("Taxonomy", ui::StyleType::Title),
        table,
        sheet_line
    )
}
