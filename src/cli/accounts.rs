use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::ledger;
use crate::models::{AccountCategory, AccountKind};

pub fn add(
    name: &str,
    category: &str,
    kind: Option<&str>,
    opening: f64,
    person: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let conn = super::open_authed()?;
    let category = AccountCategory::parse(category)?;
    let kind = match kind {
        Some(k) => AccountKind::parse(k)?,
        None => category.default_kind(),
    };
    let account =
        ledger::create_account(&conn, name, kind, category, opening, person, description)?;
    println!(
        "Added account: {} ({}, {}) with opening balance {}",
        account.name,
        account.kind.as_str(),
        account.category.as_str(),
        money(account.opening_balance)
    );
    Ok(())
}

pub fn list(kind: Option<&str>, category: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let kind = kind.map(AccountKind::parse).transpose()?;
    let category = category.map(AccountCategory::parse).transpose()?;
    let accounts = ledger::list_accounts(&conn, kind, category)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind", "Category", "Balance"]);
    for account in &accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.name),
            Cell::new(account.kind.as_str()),
            Cell::new(account.category.as_str()),
            Cell::new(money(account.current_balance)),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn show(name: &str) -> Result<()> {
    let conn = super::open_authed()?;
    let account = ledger::get_account_by_name(&conn, name)?;
    println!("{} (#{})", account.name, account.id);
    println!("  kind:      {}", account.kind.as_str());
    println!("  category:  {}", account.category.as_str());
    println!("  opening:   {}", money(account.opening_balance));
    println!("  balance:   {}", money(account.current_balance));
    if let Some(person) = &account.person_name {
        println!("  person:    {person}");
    }
    if let Some(description) = &account.description {
        println!("  notes:     {description}");
    }
    Ok(())
}

pub fn update(
    name: &str,
    new_name: Option<&str>,
    opening: Option<f64>,
    description: Option<&str>,
) -> Result<()> {
    let conn = super::open_authed()?;
    let account = ledger::get_account_by_name(&conn, name)?;
    let updated = ledger::update_account(&conn, account.id, new_name, opening, description)?;
    println!(
        "Updated {}: balance is now {}",
        updated.name,
        money(updated.current_balance)
    );
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let conn = super::open_authed()?;
    let account = ledger::get_account_by_name(&conn, name)?;
    ledger::delete_account(&conn, account.id)?;
    println!("Deleted account: {name}");
    Ok(())
}
