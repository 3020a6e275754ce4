use super::ui;
use crate::App;
use crate::core::currency::Currency;
use crate::core::{ExpenseReply, ExpenseSubmission, IngestOutcome};
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Submits one expense and prints the reply.
///
/// Fails only when nothing was saved. A mirror fault is printed as a warning
/// because resubmitting would store the expense twice.
pub async fn run(app: &App, submission: &ExpenseSubmission) -> Result<ExpenseReply> {
    let pb = ui::new_spinner("Saving expense...");
    let result = app.pipeline.ingest(submission).await;
    pb.finish_and_clear();

    let reply = ExpenseReply::from(&result);
    if let Ok(outcome) = &result {
        println!("{}", display_outcome(outcome));
    }

    match (reply.success, reply.persisted) {
        (true, _) => println!("{}", ui::style_text(&reply.message, ui::StyleType::Success)),
        (false, true) => println!(
            "{} {}",
            ui::style_text("Warning:", ui::StyleType::Warning),
            reply.message
        ),
        (false, false) => {
            bail!("{} (code {})", reply.message, reply.code);
        }
    }
    Ok(reply)
}

fn display_outcome(outcome: &IngestOutcome) -> String {
    let expense = outcome.expense();
    let mut table = ui::new_styled_table();

    table.add_row(vec![ui::label_cell("ID"), Cell::new(expense.id)]);
    table.add_row(vec![ui::label_cell("Date"), Cell::new(expense.date)]);
    table.add_row(vec![
        ui::label_cell("Description"),
        Cell::new(&expense.description),
    ]);
    table.add_row(vec![
        ui::label_cell(Currency::Local.code()),
        ui::amount_cell(expense.ars_amount, Currency::Local.code()),
    ]);
    table.add_row(vec![
        ui::label_cell(Currency::Reference.code()),
        ui::amount_cell(expense.usd_amount, Currency::Reference.code()),
    ]);
    table.add_row(vec![
        ui::label_cell("Recurrent"),
        ui::optional_cell(expense.recurrent_expense_id, |id| id.to_string()),
    ]);
    table.add_row(vec![
        ui::label_cell("Mirrored"),
        match outcome.mirror_error() {
            None => Cell::new(ui::style_text("yes", ui::StyleType::Success)),
            Some(e) => Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
        },
    ]);

    format!(
        "{}\n\n{}",
        ui::style_text("Expense", ui::StyleType::Title),
        table
    )
}
