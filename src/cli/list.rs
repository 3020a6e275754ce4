use super::ui;
use crate::core::currency::Currency;
use crate::core::expense::ExpenseRecord;
use crate::store::ExpenseStore;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use uuid::Uuid;

/// Prints the owner's expenses dated within `[start, end]`, newest first.
pub async fn run(
    store: &dyn ExpenseStore,
    owner: &str,
    start: &str,
    end: &str,
) -> Result<Vec<ExpenseRecord>> {
    let owner = Uuid::parse_str(owner).with_context(|| format!("Invalid owner id: {owner}"))?;
    let start = parse_bound("start", start)?;
    let end = parse_bound("end", end)?;
    if start > end {
        bail!("start date {start} cannot be after end date {end}");
    }

    let expenses = store.expenses_in_range(owner, start, end).await?;
    if expenses.is_empty() {
        println!(
            "{}",
            ui::style_text("No expenses in range", ui::StyleType::Subtle)
        );
    } else {
        println!("{}", display_expenses(&expenses));
    }
    Ok(expenses)
}

fn parse_bound(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {name} date '{value}', expected YYYY-MM-DD"))
}

fn display_expenses(expenses: &[ExpenseRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::label_cell("Date"),
        ui::label_cell("Description"),
        ui::label_cell(Currency::Local.code()),
        ui::label_cell(Currency::Reference.code()),
        ui::label_cell("ID"),
    ]);

    let (mut local_total, mut reference_total) = (0.0, 0.0);
    for expense in expenses {
        local_total += expense.ars_amount;
        reference_total += expense.usd_amount;
        table.add_row(vec![
            Cell::new(expense.date),
            Cell::new(&expense.description),
            ui::amount_cell(expense.ars_amount, Currency::Local.code()),
            ui::amount_cell(expense.usd_amount, Currency::Reference.code()),
            Cell::new(expense.id).fg(comfy_table::Color::DarkGrey),
        ]);
    }
    table.add_row(vec![
        ui::label_cell("Total"),
        Cell::new(format!("{} expenses", expenses.len())),
        ui::amount_cell(local_total, Currency::Local.code()),
        ui::amount_cell(reference_total, Currency::Reference.code()),
        Cell::new(""),
    ]);

    format!(
        "{}\n\n{}",
        ui::style_text("Expenses", ui::StyleType::Title),
        table
    )
}
