use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::money;
use crate::reports;
use crate::transactions::{self, TxnFilters};

/// Write transactions (newest first, optionally date-ranged) as a
/// spreadsheet: one header row, one row per transaction, human-readable
/// amounts. Returns the number of data rows written.
pub fn export_transactions(
    conn: &Connection,
    out_path: &Path,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<usize> {
    let rows = transactions::list(
        conn,
        &TxnFilters {
            from_date: from_date.map(str::to_string),
            to_date: to_date.map(str::to_string),
            limit: Some(100000),
            ..Default::default()
        },
    )?;

    let mut wtr = csv::Writer::from_path(out_path)?;
    wtr.write_record(["Date", "Description", "Amount", "Type", "Account", "Category", "Reference"])?;
    for row in &rows {
        wtr.write_record([
            row.txn.date.clone(),
            row.txn.description.clone(),
            money(row.txn.amount),
            row.txn.kind.as_str().to_string(),
            row.account.clone(),
            row.category.clone().unwrap_or_default(),
            row.txn.reference.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

/// Write the balance sheet as a spreadsheet: asset rows, liability rows,
/// then the three summary lines.
pub fn export_balance_sheet(conn: &Connection, out_path: &Path) -> Result<()> {
    let sheet = reports::get_balance_sheet(conn)?;

    let mut wtr = csv::Writer::from_path(out_path)?;
    wtr.write_record(["Section", "Category", "Account", "Balance"])?;
    for account in &sheet.assets {
        wtr.write_record([
            "Assets".to_string(),
            account.category.clone(),
            account.name.clone(),
            money(account.balance),
        ])?;
    }
    for account in &sheet.liabilities {
        wtr.write_record([
            "Liabilities".to_string(),
            account.category.clone(),
            account.name.clone(),
            money(account.balance),
        ])?;
    }
    wtr.write_record(["Total Assets".to_string(), String::new(), String::new(), money(sheet.total_assets)])?;
    wtr.write_record(["Total Liabilities".to_string(), String::new(), String::new(), money(sheet.total_liabilities)])?;
    wtr.write_record(["Net Worth".to_string(), String::new(), String::new(), money(sheet.net_worth)])?;
    wtr.flush()?;
    Ok(())
}
