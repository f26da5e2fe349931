use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::importer;
use crate::ledger;

pub fn parse(file: &str, out: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let file_path = PathBuf::from(file);
    let review = importer::parse_statement(&conn, &file_path)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "Description", "Amount", "Type", "Category", "Stmt Bal."]);
    for (i, candidate) in review.candidates.iter().enumerate() {
        let category = candidate
            .category_id
            .and_then(|id| crate::categories::get_category(&conn, id).ok())
            .map(|c| c.name)
            .unwrap_or_else(|| "—".to_string());
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&candidate.date),
            Cell::new(&candidate.description),
            Cell::new(money(candidate.amount)),
            Cell::new(candidate.kind.as_str()),
            Cell::new(category),
            Cell::new(candidate.statement_balance.map(money).unwrap_or_default()),
        ]);
    }
    println!("Parsed {} candidate(s)\n{table}", review.candidates.len());

    for warning in &review.warnings {
        println!("{} {warning}", "warning:".yellow());
    }

    let out_path = out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{file}.review.json")));
    importer::write_review_file(&out_path, &review)?;
    println!("\nReview file written to {}.", out_path.display());
    println!("Edit it if needed, then run `khata import commit {} --account <name>`.", out_path.display());
    Ok(())
}

pub fn commit(file: &str, account: &str) -> Result<()> {
    let mut conn = super::open_authed()?;
    let review = importer::read_review_file(Path::new(file))?;
    let account = ledger::get_account_by_name(&conn, account)?;
    let result = importer::save_all(&mut conn, &review, account.id)?;

    if result.duplicate_file {
        println!("This statement has already been imported into {} (duplicate checksum).", account.name);
        return Ok(());
    }
    let balance = ledger::get_account(&conn, account.id)?.current_balance;
    println!(
        "Saved {} transaction(s) into {} — balance {}",
        result.saved,
        account.name,
        money(balance)
    );
    Ok(())
}
