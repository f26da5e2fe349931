use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categories;
use crate::error::Result;
use crate::fmt::money;
use crate::reports;

pub fn dashboard(recent: usize) -> Result<()> {
    let conn = super::open_authed()?;
    let dash = reports::get_dashboard(&conn, recent)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Balance"]);
    table.add_row(vec![Cell::new("Bank"), Cell::new(money(dash.bank_balance))]);
    table.add_row(vec![Cell::new("Cash"), Cell::new(money(dash.cash_balance))]);
    table.add_row(vec![Cell::new("Loans receivable"), Cell::new(money(dash.loans_receivable))]);
    table.add_row(vec![Cell::new("Investments"), Cell::new(money(dash.investments))]);
    table.add_row(vec![Cell::new("Loans payable"), Cell::new(money(dash.loans_payable))]);
    table.add_row(vec![Cell::new("Credit cards"), Cell::new(money(dash.credit_cards))]);
    table.add_row(vec![
        Cell::new("Total assets".bold()),
        Cell::new(money(dash.total_assets)),
    ]);
    table.add_row(vec![
        Cell::new("Total liabilities".bold()),
        Cell::new(money(dash.total_liabilities)),
    ]);
    let net_label = if dash.net_worth >= 0.0 {
        "NET WORTH".green().bold()
    } else {
        "NET WORTH".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), Cell::new(money(dash.net_worth))]);
    println!("Dashboard\n{table}");

    let monthly_income = money(dash.monthly_income);
    let monthly_expense = money(dash.monthly_expense);
    println!(
        "\nThis month: income {}, expense {}",
        monthly_income.as_str().green(),
        monthly_expense.as_str().red()
    );

    if !dash.recent.is_empty() {
        let mut recent_table = Table::new();
        recent_table.set_header(vec!["Date", "Description", "Amount", "Type", "Account"]);
        for row in &dash.recent {
            recent_table.add_row(vec![
                Cell::new(&row.txn.date),
                Cell::new(&row.txn.description),
                Cell::new(money(row.txn.amount)),
                Cell::new(row.txn.kind.as_str()),
                Cell::new(&row.account),
            ]);
        }
        println!("\nRecent transactions\n{recent_table}");
    }
    Ok(())
}

pub fn balance_sheet() -> Result<()> {
    let conn = super::open_authed()?;
    let sheet = reports::get_balance_sheet(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Category", "Balance"]);
    table.add_row(vec![Cell::new("ASSETS".green().bold()), Cell::new(""), Cell::new("")]);
    for account in &sheet.assets {
        table.add_row(vec![
            Cell::new(format!("  {}", account.name)),
            Cell::new(&account.category),
            Cell::new(money(account.balance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total assets".bold()),
        Cell::new(""),
        Cell::new(money(sheet.total_assets)),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
    table.add_row(vec![Cell::new("LIABILITIES".red().bold()), Cell::new(""), Cell::new("")]);
    for account in &sheet.liabilities {
        table.add_row(vec![
            Cell::new(format!("  {}", account.name)),
            Cell::new(&account.category),
            Cell::new(money(account.balance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total liabilities".bold()),
        Cell::new(""),
        Cell::new(money(sheet.total_liabilities)),
    ]);
    table.add_row(vec![
        Cell::new("NET WORTH".bold()),
        Cell::new(""),
        Cell::new(money(sheet.net_worth)),
    ]);
    println!("Balance Sheet\n{table}");
    Ok(())
}

pub fn income_expense(from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let report = reports::get_income_expense(&conn, from_date, to_date)?;

    let mut table = Table::new();
    table.set_header(vec!["Tag", "Amount"]);
    if !report.income_by_tag.is_empty() {
        table.add_row(vec![Cell::new("INCOME".green().bold()), Cell::new("")]);
        for item in &report.income_by_tag {
            table.add_row(vec![Cell::new(format!("  {}", item.tag)), Cell::new(money(item.total))]);
        }
        table.add_row(vec![
            Cell::new("Total income".bold()),
            Cell::new(money(report.total_income)),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new("")]);
    }
    if !report.expense_by_tag.is_empty() {
        table.add_row(vec![Cell::new("EXPENSES".red().bold()), Cell::new("")]);
        for item in &report.expense_by_tag {
            table.add_row(vec![Cell::new(format!("  {}", item.tag)), Cell::new(money(item.total))]);
        }
        table.add_row(vec![
            Cell::new("Total expenses".bold()),
            Cell::new(money(report.total_expense)),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new("")]);
    }
    let net_label = if report.net_income >= 0.0 {
        "NET".green().bold()
    } else {
        "NET".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), Cell::new(money(report.net_income))]);
    println!("Income & Expense\n{table}");
    Ok(())
}

pub fn category(name: &str, from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let category = categories::get_category_by_name(&conn, name)?;
    let report = reports::get_category_report(&conn, category.id, from_date, to_date)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Category", "Account"]);
    for row in &report.rows {
        table.add_row(vec![
            Cell::new(&row.txn.date),
            Cell::new(&row.txn.description),
            Cell::new(money(row.txn.amount)),
            Cell::new(row.category.as_deref().unwrap_or("—")),
            Cell::new(&row.account),
        ]);
    }
    println!("{} — {} transaction(s)\n{table}", category.name, report.count);
    println!("Total: {}", money(report.total));
    Ok(())
}
