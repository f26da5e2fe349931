use rusqlite::Connection;

use crate::error::Result;
use crate::transactions::{self, validate_date, TxnFilters, TxnRow};

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

pub struct SheetAccount {
    pub name: String,
    pub category: String,
    pub balance: f64,
}

pub struct BalanceSheet {
    pub assets: Vec<SheetAccount>,
    pub liabilities: Vec<SheetAccount>,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
}

fn side(conn: &Connection, kind: &str) -> Result<Vec<SheetAccount>> {
    let mut stmt = conn.prepare(
        "SELECT name, category, current_balance FROM accounts \
         WHERE kind = ?1 ORDER BY category, name",
    )?;
    let rows = stmt
        .query_map([kind], |row| {
            Ok(SheetAccount {
                name: row.get(0)?,
                category: row.get(1)?,
                balance: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Snapshot of every asset and liability ledger, grouped by category, with
/// `net_worth = total_assets − total_liabilities`. Pure read of the running
/// balances — no recomputation.
pub fn get_balance_sheet(conn: &Connection) -> Result<BalanceSheet> {
    let assets = side(conn, "asset")?;
    let liabilities = side(conn, "liability")?;
    let total_assets: f64 = assets.iter().map(|a| a.balance).sum();
    let total_liabilities: f64 = liabilities.iter().map(|a| a.balance).sum();
    Ok(BalanceSheet {
        assets,
        liabilities,
        total_assets,
        total_liabilities,
        net_worth: total_assets - total_liabilities,
    })
}

// ---------------------------------------------------------------------------
// Income / expense
// ---------------------------------------------------------------------------

pub struct TagTotal {
    pub tag: String,
    pub total: f64,
}

pub struct IncomeExpenseReport {
    pub income_by_tag: Vec<TagTotal>,
    pub expense_by_tag: Vec<TagTotal>,
    pub total_income: f64,
    pub total_expense: f64,
    pub net_income: f64,
}

fn date_clause(
    from_date: Option<&str>,
    to_date: Option<&str>,
    params: &mut Vec<String>,
) -> Result<String> {
    let mut clause = String::new();
    if let Some(from) = from_date {
        params.push(validate_date(from)?);
        clause.push_str(&format!(" AND t.date >= ?{}", params.len()));
    }
    if let Some(to) = to_date {
        params.push(validate_date(to)?);
        clause.push_str(&format!(" AND t.date <= ?{}", params.len()));
    }
    Ok(clause)
}

fn tag_totals(
    conn: &Connection,
    kind: &str,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<Vec<TagTotal>> {
    let mut params: Vec<String> = vec![kind.to_string()];
    let clause = date_clause(from_date, to_date, &mut params)?;
    // Sub-categories report under "Parent > Child"
    let sql = format!(
        "SELECT CASE \
             WHEN c.id IS NULL THEN 'Uncategorized' \
             WHEN pc.id IS NOT NULL THEN pc.name || ' > ' || c.name \
             ELSE c.name END AS tag, \
         SUM(t.amount) AS total \
         FROM transactions t \
         LEFT JOIN categories c ON t.category_id = c.id \
         LEFT JOIN categories pc ON c.parent_id = pc.id \
         WHERE t.kind = ?1{clause} \
         GROUP BY tag ORDER BY total DESC, tag"
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), |row| {
            Ok(TagTotal {
                tag: row.get(0)?,
                total: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Income and expense grouped by tag over an optional date range. Transfers
/// move money between own ledgers and are excluded.
pub fn get_income_expense(
    conn: &Connection,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<IncomeExpenseReport> {
    let income_by_tag = tag_totals(conn, "income", from_date, to_date)?;
    let expense_by_tag = tag_totals(conn, "expense", from_date, to_date)?;
    let total_income: f64 = income_by_tag.iter().map(|t| t.total).sum();
    let total_expense: f64 = expense_by_tag.iter().map(|t| t.total).sum();
    Ok(IncomeExpenseReport {
        income_by_tag,
        expense_by_tag,
        total_income,
        total_expense,
        net_income: total_income - total_expense,
    })
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard {
    pub bank_balance: f64,
    pub cash_balance: f64,
    pub loans_receivable: f64,
    pub loans_payable: f64,
    pub investments: f64,
    pub credit_cards: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
    pub monthly_income: f64,
    pub monthly_expense: f64,
    pub recent: Vec<TxnRow>,
}

fn category_total(conn: &Connection, category: &str) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(current_balance), 0) FROM accounts WHERE category = ?1",
        [category],
        |r| r.get(0),
    )?)
}

pub fn get_dashboard(conn: &Connection, recent_limit: usize) -> Result<Dashboard> {
    let sheet = get_balance_sheet(conn)?;

    let month = chrono::Local::now().format("%Y-%m").to_string();
    let month_sum = |kind: &str| -> Result<f64> {
        Ok(conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE kind = ?1 AND date LIKE ?2",
            rusqlite::params![kind, format!("{month}%")],
            |r| r.get(0),
        )?)
    };

    let recent = transactions::list(
        conn,
        &TxnFilters { limit: Some(recent_limit), ..Default::default() },
    )?;

    Ok(Dashboard {
        bank_balance: category_total(conn, "bank")?,
        cash_balance: category_total(conn, "cash")?,
        loans_receivable: category_total(conn, "loan_receivable")?,
        loans_payable: category_total(conn, "loan_payable")?,
        investments: category_total(conn, "investment")?,
        credit_cards: category_total(conn, "credit_card")?,
        total_assets: sheet.total_assets,
        total_liabilities: sheet.total_liabilities,
        net_worth: sheet.net_worth,
        monthly_income: month_sum("income")?,
        monthly_expense: month_sum("expense")?,
        recent,
    })
}

// ---------------------------------------------------------------------------
// Category report
// ---------------------------------------------------------------------------

pub struct CategoryReport {
    pub rows: Vec<TxnRow>,
    pub total: f64,
    pub count: usize,
}

/// Transactions for one category and its children, date-ranged.
pub fn get_category_report(
    conn: &Connection,
    category_id: i64,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<CategoryReport> {
    crate::categories::get_category(conn, category_id)?;
    let rows = transactions::list(
        conn,
        &TxnFilters {
            category_id: Some(category_id),
            from_date: from_date.map(str::to_string),
            to_date: to_date.map(str::to_string),
            limit: Some(10000),
            ..Default::default()
        },
    )?;
    let total: f64 = rows.iter().map(|r| r.txn.amount).sum();
    let count = rows.len();
    Ok(CategoryReport { rows, total, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::ledger;
    use crate::models::{AccountCategory, AccountKind, TxnKind};
    use crate::transactions::{create, transfer, TxnInput, SOURCE_MANUAL};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_account(
        conn: &Connection,
        name: &str,
        kind: AccountKind,
        category: AccountCategory,
        opening: f64,
    ) -> i64 {
        ledger::create_account(conn, name, kind, category, opening, None, None)
            .unwrap()
            .id
    }

    fn category_id(conn: &Connection, name: &str) -> i64 {
        conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |r| r.get(0))
            .unwrap()
    }

    fn txn(
        conn: &mut Connection,
        date: &str,
        desc: &str,
        amount: f64,
        kind: TxnKind,
        account_id: i64,
        category: Option<&str>,
    ) {
        let category_id = category.map(|c| category_id(conn, c));
        create(
            conn,
            TxnInput {
                date: date.into(),
                description: desc.into(),
                amount,
                kind,
                account_id,
                category_id,
                loan_id: None,
                reference: None,
                notes: None,
                source: SOURCE_MANUAL.into(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_balance_sheet_identity() {
        let (_dir, conn) = test_db();
        add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 50000.0);
        add_account(&conn, "PPF", AccountKind::Asset, AccountCategory::Investment, 20000.0);
        add_account(&conn, "Amex", AccountKind::Liability, AccountCategory::CreditCard, 7000.0);
        let sheet = get_balance_sheet(&conn).unwrap();
        // Seeded Cash ledger sits at zero
        assert_eq!(sheet.total_assets, 70000.0);
        assert_eq!(sheet.total_liabilities, 7000.0);
        assert_eq!(sheet.net_worth, sheet.total_assets - sheet.total_liabilities);
        assert!(sheet.assets.iter().any(|a| a.category == "cash"));
        assert_eq!(sheet.liabilities.len(), 1);
    }

    #[test]
    fn test_income_expense_identities() {
        let (_dir, mut conn) = test_db();
        let bank = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 0.0);
        txn(&mut conn, "2026-01-05", "Salary Jan", 50000.0, TxnKind::Income, bank, Some("Salary"));
        txn(&mut conn, "2026-01-08", "Thali", 200.0, TxnKind::Expense, bank, Some("Food & Dining"));
        txn(&mut conn, "2026-01-09", "Metro card", 500.0, TxnKind::Expense, bank, Some("Transport"));
        txn(&mut conn, "2026-01-10", "Mystery spend", 100.0, TxnKind::Expense, bank, None);

        let report = get_income_expense(&conn, None, None).unwrap();
        assert_eq!(report.total_income, 50000.0);
        assert_eq!(report.total_expense, 800.0);
        assert_eq!(report.net_income, report.total_income - report.total_expense);
        let income_sum: f64 = report.income_by_tag.iter().map(|t| t.total).sum();
        let expense_sum: f64 = report.expense_by_tag.iter().map(|t| t.total).sum();
        assert_eq!(income_sum, report.total_income);
        assert_eq!(expense_sum, report.total_expense);
        assert!(report.expense_by_tag.iter().any(|t| t.tag == "Uncategorized" && t.total == 100.0));
    }

    #[test]
    fn test_income_expense_date_range() {
        let (_dir, mut conn) = test_db();
        let bank = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 0.0);
        txn(&mut conn, "2026-01-05", "Jan spend", 100.0, TxnKind::Expense, bank, None);
        txn(&mut conn, "2026-02-05", "Feb spend", 300.0, TxnKind::Expense, bank, None);
        let report = get_income_expense(&conn, Some("2026-02-01"), Some("2026-02-28")).unwrap();
        assert_eq!(report.total_expense, 300.0);
        let report = get_income_expense(&conn, Some("2026-01-01"), None).unwrap();
        assert_eq!(report.total_expense, 400.0);
    }

    #[test]
    fn test_income_expense_excludes_transfers() {
        let (_dir, mut conn) = test_db();
        let a = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 1000.0);
        let b = add_account(&conn, "SBI", AccountKind::Asset, AccountCategory::Bank, 0.0);
        transfer(&mut conn, "2026-01-05", "Shuffle", 500.0, a, b, None).unwrap();
        let report = get_income_expense(&conn, None, None).unwrap();
        assert_eq!(report.total_income, 0.0);
        assert_eq!(report.total_expense, 0.0);
    }

    #[test]
    fn test_subcategory_reports_under_parent() {
        let (_dir, mut conn) = test_db();
        let bank = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 0.0);
        txn(&mut conn, "2026-01-05", "Dinner order", 450.0, TxnKind::Expense, bank, Some("Zomato/Swiggy"));
        let report = get_income_expense(&conn, None, None).unwrap();
        assert!(report
            .expense_by_tag
            .iter()
            .any(|t| t.tag == "Food & Dining > Zomato/Swiggy" && t.total == 450.0));
    }

    #[test]
    fn test_expense_scenario_cash_food() {
        let (_dir, mut conn) = test_db();
        let cash = ledger::get_or_create_cash(&conn).unwrap().id;
        ledger::update_account(&conn, cash, None, Some(1000.0), None).unwrap();
        txn(&mut conn, "2026-01-05", "Lunch", 200.0, TxnKind::Expense, cash, Some("Food & Dining"));
        assert_eq!(ledger::get_account(&conn, cash).unwrap().current_balance, 800.0);
        let report = get_income_expense(&conn, None, None).unwrap();
        let food = report
            .expense_by_tag
            .iter()
            .find(|t| t.tag == "Food & Dining")
            .unwrap();
        assert_eq!(food.total, 200.0);
    }

    #[test]
    fn test_dashboard_subtotals_and_recent() {
        let (_dir, mut conn) = test_db();
        let bank = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 40000.0);
        add_account(&conn, "Amex", AccountKind::Liability, AccountCategory::CreditCard, 5000.0);
        add_account(&conn, "Loan - Ravi", AccountKind::Asset, AccountCategory::LoanReceivable, 10000.0);
        let this_month = chrono::Local::now().format("%Y-%m-15").to_string();
        txn(&mut conn, &this_month, "Salary", 30000.0, TxnKind::Income, bank, Some("Salary"));
        txn(&mut conn, &this_month, "Rent", 12000.0, TxnKind::Expense, bank, Some("Rent"));
        txn(&mut conn, "2020-01-05", "Old spend", 99.0, TxnKind::Expense, bank, None);

        let dash = get_dashboard(&conn, 2).unwrap();
        // 40000 + 30000 − 12000 − 99
        assert_eq!(dash.bank_balance, 57901.0);
        assert_eq!(dash.cash_balance, 0.0);
        assert_eq!(dash.loans_receivable, 10000.0);
        assert_eq!(dash.credit_cards, 5000.0);
        assert_eq!(dash.total_assets, 67901.0);
        assert_eq!(dash.total_liabilities, 5000.0);
        assert_eq!(dash.net_worth, 62901.0);
        assert_eq!(dash.monthly_income, 30000.0);
        assert_eq!(dash.monthly_expense, 12000.0);
        assert_eq!(dash.recent.len(), 2);
    }

    #[test]
    fn test_category_report_includes_children() {
        let (_dir, mut conn) = test_db();
        let bank = add_account(&conn, "HDFC", AccountKind::Asset, AccountCategory::Bank, 0.0);
        txn(&mut conn, "2026-01-05", "Groceries run", 900.0, TxnKind::Expense, bank, Some("Groceries"));
        txn(&mut conn, "2026-01-06", "Restaurant", 600.0, TxnKind::Expense, bank, Some("Restaurants"));
        txn(&mut conn, "2026-01-07", "Metro", 100.0, TxnKind::Expense, bank, Some("Transport"));
        let food = category_id(&conn, "Food & Dining");
        let report = get_category_report(&conn, food, None, None).unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.total, 1500.0);
        let report = get_category_report(&conn, food, Some("2026-01-06"), None).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.total, 600.0);
    }
}
