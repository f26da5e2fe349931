use comfy_table::{Cell, Table};

use crate::categories;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger;
use crate::models::TxnKind;
use crate::transactions::{self, TxnFilters, TxnInput, TxnPatch, TxnRow, SOURCE_MANUAL};

#[allow(clippy::too_many_arguments)]
pub fn add(
    date: &str,
    description: &str,
    amount: f64,
    account: &str,
    kind: &str,
    category: Option<&str>,
    loan: Option<i64>,
    reference: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_authed()?;
    let account = ledger::get_account_by_name(&conn, account)?;
    let category_id = category
        .map(|c| categories::get_category_by_name(&conn, c).map(|c| c.id))
        .transpose()?;
    let txn = transactions::create(
        &mut conn,
        TxnInput {
            date: date.into(),
            description: description.into(),
            amount,
            kind: TxnKind::parse(kind)?,
            account_id: account.id,
            category_id,
            loan_id: loan,
            reference: reference.map(str::to_string),
            notes: notes.map(str::to_string),
            source: SOURCE_MANUAL.into(),
        },
    )?;
    let balance = ledger::get_account(&conn, account.id)?.current_balance;
    println!(
        "Recorded #{}: {} {} on {} — {} balance {}",
        txn.id,
        txn.kind.as_str(),
        money(txn.amount),
        txn.date,
        account.name,
        money(balance)
    );
    if category.is_none() {
        if let Some(category_id) = txn.category_id {
            let name = categories::get_category(&conn, category_id)?.name;
            println!("Auto-tagged as '{name}' from a past transaction.");
        }
    }
    Ok(())
}

fn render(rows: &[TxnRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Type", "Account", "Category"]);
    for row in rows {
        let account = match &row.payee_account {
            Some(payee) => format!("{} → {}", row.account, payee),
            None => row.account.clone(),
        };
        table.add_row(vec![
            Cell::new(row.txn.id),
            Cell::new(&row.txn.date),
            Cell::new(&row.txn.description),
            Cell::new(money(row.txn.amount)),
            Cell::new(row.txn.kind.as_str()),
            Cell::new(account),
            Cell::new(row.category.as_deref().unwrap_or("—")),
        ]);
    }
    table
}

#[allow(clippy::too_many_arguments)]
pub fn list(
    account: Option<&str>,
    category: Option<&str>,
    kind: Option<&str>,
    from_date: Option<&str>,
    to_date: Option<&str>,
    untagged: bool,
    search: Option<&str>,
    limit: usize,
) -> Result<()> {
    let conn = super::open_authed()?;
    let account_id = account
        .map(|a| ledger::get_account_by_name(&conn, a).map(|a| a.id))
        .transpose()?;
    let category_id = category
        .map(|c| categories::get_category_by_name(&conn, c).map(|c| c.id))
        .transpose()?;
    let rows = transactions::list(
        &conn,
        &TxnFilters {
            account_id,
            category_id,
            kind: kind.map(TxnKind::parse).transpose()?,
            from_date: from_date.map(str::to_string),
            to_date: to_date.map(str::to_string),
            untagged_only: untagged,
            search: search.map(str::to_string),
            limit: Some(limit),
        },
    )?;
    println!("Transactions ({})\n{}", rows.len(), render(&rows));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    id: i64,
    date: Option<&str>,
    description: Option<&str>,
    amount: Option<f64>,
    kind: Option<&str>,
    account: Option<&str>,
    category: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_authed()?;
    let account_id = account
        .map(|a| ledger::get_account_by_name(&conn, a).map(|a| a.id))
        .transpose()?;
    let category_id = category
        .map(|c| categories::get_category_by_name(&conn, c).map(|c| c.id))
        .transpose()?;
    let txn = transactions::update(
        &mut conn,
        id,
        TxnPatch {
            date: date.map(str::to_string),
            description: description.map(str::to_string),
            amount,
            kind: kind.map(TxnKind::parse).transpose()?,
            account_id,
            category_id,
            notes: notes.map(str::to_string),
        },
    )?;
    println!("Updated #{}: {} {} on {}", txn.id, txn.kind.as_str(), money(txn.amount), txn.date);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let mut conn = super::open_authed()?;
    transactions::delete(&mut conn, id)?;
    println!("Deleted transaction #{id}; its balance effect was reversed.");
    Ok(())
}

pub fn transfer(
    date: &str,
    description: &str,
    amount: f64,
    from: &str,
    to: &str,
    notes: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_authed()?;
    let from_account = ledger::get_account_by_name(&conn, from)?;
    let to_account = ledger::get_account_by_name(&conn, to)?;
    let txn = transactions::transfer(
        &mut conn,
        date,
        description,
        amount,
        from_account.id,
        to_account.id,
        notes,
    )?;
    println!(
        "Transferred {} from {} to {} on {} (#{})",
        money(txn.amount),
        from_account.name,
        to_account.name,
        txn.date,
        txn.id
    );
    Ok(())
}

pub fn bulk_tag(category: &str, ids: &[i64]) -> Result<()> {
    let conn = super::open_authed()?;
    let category = categories::get_category_by_name(&conn, category)?;
    let tagged = transactions::bulk_tag(&conn, ids, category.id)?;
    println!("Tagged {tagged} transaction(s) as '{}'.", category.name);
    Ok(())
}
