use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{KhataError, Result};
use crate::models::{Account, AccountCategory, AccountKind, TxnKind};

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: AccountKind::parse(&row.get::<_, String>(2)?)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        category: AccountCategory::parse(&row.get::<_, String>(3)?)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        opening_balance: row.get(4)?,
        current_balance: row.get(5)?,
        person_name: row.get(6)?,
        description: row.get(7)?,
    })
}

const ACCOUNT_COLS: &str =
    "id, name, kind, category, opening_balance, current_balance, person_name, description";

pub fn create_account(
    conn: &Connection,
    name: &str,
    kind: AccountKind,
    category: AccountCategory,
    opening_balance: f64,
    person_name: Option<&str>,
    description: Option<&str>,
) -> Result<Account> {
    if name.trim().is_empty() {
        return Err(KhataError::Validation("Account name must not be empty".into()));
    }
    conn.execute(
        "INSERT INTO accounts (name, kind, category, opening_balance, current_balance, person_name, description) \
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6)",
        rusqlite::params![
            name.trim(),
            kind.as_str(),
            category.as_str(),
            opening_balance,
            person_name,
            description
        ],
    )?;
    get_account(conn, conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id = ?1"),
        [id],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound("Account".into()))
}

pub fn get_account_by_name(conn: &Connection, name: &str) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE name = ?1"),
        [name],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound(format!("Account '{name}'")))
}

pub fn list_accounts(
    conn: &Connection,
    kind: Option<AccountKind>,
    category: Option<AccountCategory>,
) -> Result<Vec<Account>> {
    let mut sql = format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE 1=1");
    let mut params: Vec<String> = Vec::new();
    if let Some(k) = kind {
        params.push(k.as_str().to_string());
        sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }
    if let Some(c) = category {
        params.push(c.as_str().to_string());
        sql.push_str(&format!(" AND category = ?{}", params.len()));
    }
    sql.push_str(" ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Edits name/description/opening balance. Changing the opening balance
/// shifts the current balance by the same delta so transaction effects are
/// preserved.
pub fn update_account(
    conn: &Connection,
    id: i64,
    name: Option<&str>,
    opening_balance: Option<f64>,
    description: Option<&str>,
) -> Result<Account> {
    let existing = get_account(conn, id)?;
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(KhataError::Validation("Account name must not be empty".into()));
        }
        conn.execute(
            "UPDATE accounts SET name = ?1 WHERE id = ?2",
            rusqlite::params![name.trim(), id],
        )?;
    }
    if let Some(opening) = opening_balance {
        let diff = opening - existing.opening_balance;
        conn.execute(
            "UPDATE accounts SET opening_balance = ?1, current_balance = current_balance + ?2 \
             WHERE id = ?3",
            rusqlite::params![opening, diff, id],
        )?;
    }
    if let Some(desc) = description {
        conn.execute(
            "UPDATE accounts SET description = ?1 WHERE id = ?2",
            rusqlite::params![desc, id],
        )?;
    }
    get_account(conn, id)
}

/// Deleting an account still referenced by transactions or a loan is
/// blocked rather than cascaded.
pub fn delete_account(conn: &Connection, id: i64) -> Result<()> {
    get_account(conn, id)?;
    let txns: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE account_id = ?1 OR payee_account_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    if txns > 0 {
        return Err(KhataError::Conflict(format!(
            "Account has {txns} linked transaction(s); delete or reassign them first"
        )));
    }
    let loans: i64 = conn.query_row(
        "SELECT count(*) FROM loans WHERE account_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    if loans > 0 {
        return Err(KhataError::Conflict(
            "Account is linked to a loan; delete the loan instead".into(),
        ));
    }
    conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
    Ok(())
}

/// Idempotent default-ledger lookup: returns the Cash account, creating it
/// when absent.
pub fn get_or_create_cash(conn: &Connection) -> Result<Account> {
    let existing = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE category = 'cash' ORDER BY id LIMIT 1"),
            [],
            account_from_row,
        )
        .optional()?;
    if let Some(account) = existing {
        return Ok(account);
    }
    create_account(
        conn,
        "Cash",
        AccountKind::Asset,
        AccountCategory::Cash,
        0.0,
        None,
        Some("Cash in hand"),
    )
}

// ---------------------------------------------------------------------------
// Balance mutator
// ---------------------------------------------------------------------------

/// Effect of one income/expense transaction on its account's balance.
/// Debit-normal accounts (asset, expense) lose on expense and gain on
/// income; liability/income accounts have the polarity inverted. Transfer
/// legs do not go through this: a transfer is always −amount on the source
/// and +amount on the destination.
pub fn signed_delta(kind: AccountKind, txn_kind: TxnKind, amount: f64) -> f64 {
    let base = match txn_kind {
        TxnKind::Income => amount,
        TxnKind::Expense => -amount,
        TxnKind::Transfer => 0.0,
    };
    if kind.is_debit_normal() {
        base
    } else {
        -base
    }
}

/// Adds `delta` to the account's running balance. Reversal is the same call
/// with the negated delta. Fails with NotFound when the account row is
/// missing so the enclosing write can abort.
pub fn apply_delta(conn: &Connection, account_id: i64, delta: f64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET current_balance = current_balance + ?1 WHERE id = ?2",
        rusqlite::params![delta, account_id],
    )?;
    if changed == 0 {
        return Err(KhataError::NotFound("Account".into()));
    }
    Ok(())
}

pub struct BalanceFix {
    pub account: String,
    pub stored: f64,
    pub computed: f64,
}

/// Consistency-recovery tool: rebuild every running balance from the opening
/// balance plus full transaction history, returning the accounts whose
/// stored value had drifted.
pub fn recompute_all_balances(conn: &Connection) -> Result<Vec<BalanceFix>> {
    let accounts = list_accounts(conn, None, None)?;
    let mut fixes = Vec::new();
    for account in accounts {
        let computed = account.opening_balance + transaction_effects(conn, &account)?;
        if (computed - account.current_balance).abs() > 1e-9 {
            conn.execute(
                "UPDATE accounts SET current_balance = ?1 WHERE id = ?2",
                rusqlite::params![computed, account.id],
            )?;
            fixes.push(BalanceFix {
                account: account.name,
                stored: account.current_balance,
                computed,
            });
        }
    }
    Ok(fixes)
}

fn transaction_effects(conn: &Connection, account: &Account) -> Result<f64> {
    let sum = |sql: &str| -> Result<f64> {
        Ok(conn.query_row(sql, [account.id], |r| r.get::<_, f64>(0))?)
    };
    let income = sum(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = ?1 AND kind = 'income'",
    )?;
    let expense = sum(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = ?1 AND kind = 'expense'",
    )?;
    let transfers_out = sum(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = ?1 AND kind = 'transfer'",
    )?;
    let transfers_in = sum(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE payee_account_id = ?1 AND kind = 'transfer'",
    )?;
    let directional = if account.kind.is_debit_normal() {
        income - expense
    } else {
        expense - income
    };
    Ok(directional - transfers_out + transfers_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_bank(conn: &Connection, name: &str, opening: f64) -> Account {
        create_account(
            conn,
            name,
            AccountKind::Asset,
            AccountCategory::Bank,
            opening,
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_create_sets_current_to_opening() {
        let (_dir, conn) = test_db();
        let account = add_bank(&conn, "HDFC", 1500.0);
        assert_eq!(account.opening_balance, 1500.0);
        assert_eq!(account.current_balance, 1500.0);
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let (_dir, conn) = test_db();
        let err = create_account(
            &conn,
            "  ",
            AccountKind::Asset,
            AccountCategory::Bank,
            0.0,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, KhataError::Validation(_)));
    }

    #[test]
    fn test_get_account_not_found() {
        let (_dir, conn) = test_db();
        assert!(matches!(get_account(&conn, 999), Err(KhataError::NotFound(_))));
    }

    #[test]
    fn test_list_accounts_filters() {
        let (_dir, conn) = test_db();
        add_bank(&conn, "HDFC", 0.0);
        create_account(
            &conn,
            "Amex",
            AccountKind::Liability,
            AccountCategory::CreditCard,
            0.0,
            None,
            None,
        )
        .unwrap();
        let liabilities = list_accounts(&conn, Some(AccountKind::Liability), None).unwrap();
        assert_eq!(liabilities.len(), 1);
        assert_eq!(liabilities[0].name, "Amex");
        let banks = list_accounts(&conn, None, Some(AccountCategory::Bank)).unwrap();
        assert_eq!(banks.len(), 1);
        // Seeded Cash + HDFC + Amex
        assert_eq!(list_accounts(&conn, None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_update_opening_balance_shifts_current() {
        let (_dir, conn) = test_db();
        let account = add_bank(&conn, "HDFC", 1000.0);
        apply_delta(&conn, account.id, -200.0).unwrap();
        let updated = update_account(&conn, account.id, None, Some(1500.0), None).unwrap();
        assert_eq!(updated.opening_balance, 1500.0);
        assert_eq!(updated.current_balance, 1300.0);
    }

    #[test]
    fn test_delete_blocked_by_transactions() {
        let (_dir, conn) = test_db();
        let account = add_bank(&conn, "HDFC", 0.0);
        conn.execute(
            "INSERT INTO transactions (date, description, amount, kind, account_id) \
             VALUES ('2026-01-05', 'Chai', 20.0, 'expense', ?1)",
            [account.id],
        )
        .unwrap();
        let err = delete_account(&conn, account.id).unwrap_err();
        assert!(matches!(err, KhataError::Conflict(_)));
    }

    #[test]
    fn test_delete_unreferenced_account() {
        let (_dir, conn) = test_db();
        let account = add_bank(&conn, "HDFC", 0.0);
        delete_account(&conn, account.id).unwrap();
        assert!(get_account(&conn, account.id).is_err());
    }

    #[test]
    fn test_get_or_create_cash_is_idempotent() {
        let (_dir, conn) = test_db();
        let first = get_or_create_cash(&conn).unwrap();
        let second = get_or_create_cash(&conn).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.category, AccountCategory::Cash);
    }

    #[test]
    fn test_signed_delta_polarity() {
        // Debit-normal: expenses drain, income fills
        assert_eq!(signed_delta(AccountKind::Asset, TxnKind::Expense, 200.0), -200.0);
        assert_eq!(signed_delta(AccountKind::Asset, TxnKind::Income, 200.0), 200.0);
        // Liability: an expense grows what is owed
        assert_eq!(signed_delta(AccountKind::Liability, TxnKind::Expense, 200.0), 200.0);
        assert_eq!(signed_delta(AccountKind::Liability, TxnKind::Income, 200.0), -200.0);
        // Transfer legs are handled outside signed_delta
        assert_eq!(signed_delta(AccountKind::Asset, TxnKind::Transfer, 200.0), 0.0);
    }

    #[test]
    fn test_apply_delta_missing_account() {
        let (_dir, conn) = test_db();
        let err = apply_delta(&conn, 999, 10.0).unwrap_err();
        assert!(matches!(err, KhataError::NotFound(_)));
    }

    #[test]
    fn test_recompute_repairs_drift() {
        let (_dir, conn) = test_db();
        let account = add_bank(&conn, "HDFC", 1000.0);
        conn.execute(
            "INSERT INTO transactions (date, description, amount, kind, account_id) \
             VALUES ('2026-01-05', 'Groceries', 200.0, 'expense', ?1)",
            [account.id],
        )
        .unwrap();
        // Corrupt the stored balance
        conn.execute(
            "UPDATE accounts SET current_balance = 5.0 WHERE id = ?1",
            [account.id],
        )
        .unwrap();
        let fixes = recompute_all_balances(&conn).unwrap();
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].stored, 5.0);
        assert_eq!(fixes[0].computed, 800.0);
        assert_eq!(get_account(&conn, account.id).unwrap().current_balance, 800.0);
        // Second run is clean
        assert!(recompute_all_balances(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_recompute_handles_transfers() {
        let (_dir, conn) = test_db();
        let a = add_bank(&conn, "HDFC", 1000.0);
        let b = add_bank(&conn, "SBI", 0.0);
        conn.execute(
            "INSERT INTO transactions (date, description, amount, kind, account_id, payee_account_id) \
             VALUES ('2026-01-05', 'Move', 300.0, 'transfer', ?1, ?2)",
            [a.id, b.id],
        )
        .unwrap();
        conn.execute("UPDATE accounts SET current_balance = 0 WHERE id IN (?1, ?2)", [a.id, b.id])
            .unwrap();
        recompute_all_balances(&conn).unwrap();
        assert_eq!(get_account(&conn, a.id).unwrap().current_balance, 700.0);
        assert_eq!(get_account(&conn, b.id).unwrap().current_balance, 300.0);
    }
}
