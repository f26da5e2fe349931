use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::categories;
use crate::error::{KhataError, Result};
use crate::ledger;
use crate::models::{CategoryKind, Transaction, TxnKind};
use crate::tagger;

pub const SOURCE_MANUAL: &str = "manual";
pub const SOURCE_BANK_IMPORT: &str = "bank_import";

#[derive(Debug, Clone)]
pub struct TxnInput {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub account_id: i64,
    pub category_id: Option<i64>,
    pub loan_id: Option<i64>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub source: String,
}

#[derive(Debug, Default, Clone)]
pub struct TxnPatch {
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TxnKind>,
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct TxnFilters {
    pub account_id: Option<i64>,
    pub category_id: Option<i64>,
    pub kind: Option<TxnKind>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub untagged_only: bool,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Transaction row joined with the names a listing or export needs.
pub struct TxnRow {
    pub txn: Transaction,
    pub account: String,
    pub payee_account: Option<String>,
    pub category: Option<String>,
}

pub fn validate_date(date: &str) -> Result<String> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        KhataError::Validation(format!("Invalid date '{date}', expected YYYY-MM-DD"))
    })?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

fn validate_amount(amount: f64) -> Result<()> {
    if !(amount > 0.0) || !amount.is_finite() {
        return Err(KhataError::Validation("Amount must be greater than zero".into()));
    }
    Ok(())
}

/// A category on an income/expense transaction must carry the matching kind.
fn validate_category(conn: &Connection, category_id: i64, kind: TxnKind) -> Result<()> {
    let category = categories::get_category(conn, category_id)?;
    let expected = match kind {
        TxnKind::Income => CategoryKind::Income,
        TxnKind::Expense => CategoryKind::Expense,
        TxnKind::Transfer => {
            return Err(KhataError::Validation("Transfers are not categorized".into()))
        }
    };
    if category.kind != expected {
        return Err(KhataError::Validation(format!(
            "Category '{}' is {}, not {}",
            category.name,
            category.kind.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}

fn txn_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind: TxnKind::parse(&row.get::<_, String>(4)?)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        account_id: row.get(5)?,
        payee_account_id: row.get(6)?,
        category_id: row.get(7)?,
        loan_id: row.get(8)?,
        reference: row.get(9)?,
        notes: row.get(10)?,
        source: row.get(11)?,
    })
}

const TXN_COLS: &str = "id, date, description, amount, kind, account_id, payee_account_id, \
                        category_id, loan_id, reference, notes, source";

pub fn get(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TXN_COLS} FROM transactions WHERE id = ?1"),
        [id],
        txn_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound("Transaction".into()))
}

// ---------------------------------------------------------------------------
// Balance effects
// ---------------------------------------------------------------------------

fn apply_effect(conn: &Connection, txn: &Transaction, direction: f64) -> Result<()> {
    match txn.kind {
        TxnKind::Transfer => {
            let payee = txn.payee_account_id.ok_or_else(|| {
                KhataError::Validation("Transfer is missing a destination account".into())
            })?;
            ledger::apply_delta(conn, txn.account_id, -txn.amount * direction)?;
            ledger::apply_delta(conn, payee, txn.amount * direction)?;
        }
        _ => {
            let account = ledger::get_account(conn, txn.account_id)?;
            let delta = ledger::signed_delta(account.kind, txn.kind, txn.amount);
            ledger::apply_delta(conn, txn.account_id, delta * direction)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Create / transfer
// ---------------------------------------------------------------------------

/// Creates an income/expense transaction. The row insert and the balance
/// mutation commit together or not at all; a missing account aborts the
/// whole write. An untagged description is run through the auto-tag matcher
/// before persisting.
pub fn create(conn: &mut Connection, input: TxnInput) -> Result<Transaction> {
    if input.kind == TxnKind::Transfer {
        return Err(KhataError::Validation(
            "Use a transfer to move money between accounts".into(),
        ));
    }
    validate_amount(input.amount)?;
    let date = validate_date(&input.date)?;
    ledger::get_account(conn, input.account_id)?;

    let mut category_id = input.category_id;
    match category_id {
        Some(id) => validate_category(conn, id, input.kind)?,
        None => {
            if let Some(matched) = tagger::match_description(conn, &input.description)? {
                // Only adopt a learned tag whose kind fits this transaction
                if validate_category(conn, matched, input.kind).is_ok() {
                    category_id = Some(matched);
                }
            }
        }
    }
    if let Some(loan_id) = input.loan_id {
        let known: Option<i64> = conn
            .query_row("SELECT id FROM loans WHERE id = ?1", [loan_id], |r| r.get(0))
            .optional()?;
        if known.is_none() {
            return Err(KhataError::NotFound("Loan".into()));
        }
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO transactions (date, description, amount, kind, account_id, category_id, \
         loan_id, reference, notes, source) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            date,
            input.description,
            input.amount,
            input.kind.as_str(),
            input.account_id,
            category_id,
            input.loan_id,
            input.reference,
            input.notes,
            input.source,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let txn = get(&tx, id)?;
    apply_effect(&tx, &txn, 1.0)?;
    if let Some(category_id) = category_id {
        tagger::learn_pattern(&tx, &input.description, category_id)?;
    }
    tx.commit()?;
    Ok(txn)
}

/// Moves `amount` between two distinct accounts in one call: −amount on the
/// source, +amount on the destination.
pub fn transfer(
    conn: &mut Connection,
    date: &str,
    description: &str,
    amount: f64,
    from_account_id: i64,
    to_account_id: i64,
    notes: Option<&str>,
) -> Result<Transaction> {
    validate_amount(amount)?;
    let date = validate_date(date)?;
    if from_account_id == to_account_id {
        return Err(KhataError::Validation(
            "Source and destination accounts must differ".into(),
        ));
    }
    ledger::get_account(conn, from_account_id)?;
    ledger::get_account(conn, to_account_id)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO transactions (date, description, amount, kind, account_id, payee_account_id, \
         notes, source) VALUES (?1, ?2, ?3, 'transfer', ?4, ?5, ?6, ?7)",
        rusqlite::params![date, description, amount, from_account_id, to_account_id, notes, SOURCE_MANUAL],
    )?;
    let txn = get(&tx, tx.last_insert_rowid())?;
    apply_effect(&tx, &txn, 1.0)?;
    tx.commit()?;
    Ok(txn)
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// Edits recompute balance deltas: the prior effect is reversed from the old
/// state before the new effect is applied, so editing an amount from X to Y
/// moves the balance by exactly (Y − X).
pub fn update(conn: &mut Connection, id: i64, patch: TxnPatch) -> Result<Transaction> {
    let old = get(conn, id)?;

    let new_kind = patch.kind.unwrap_or(old.kind);
    if (old.kind == TxnKind::Transfer) != (new_kind == TxnKind::Transfer) {
        return Err(KhataError::Validation(
            "Cannot change between transfer and non-transfer; delete and re-enter instead".into(),
        ));
    }
    let new_amount = patch.amount.unwrap_or(old.amount);
    validate_amount(new_amount)?;
    let new_date = match &patch.date {
        Some(d) => validate_date(d)?,
        None => old.date.clone(),
    };
    let new_account_id = patch.account_id.unwrap_or(old.account_id);
    ledger::get_account(conn, new_account_id)?;
    let new_category_id = patch.category_id.or(old.category_id);
    if let Some(category_id) = new_category_id {
        validate_category(conn, category_id, new_kind)?;
    }
    let new_description = patch.description.unwrap_or_else(|| old.description.clone());
    let new_notes = patch.notes.or_else(|| old.notes.clone());

    let tx = conn.transaction()?;
    apply_effect(&tx, &old, -1.0)?;
    tx.execute(
        "UPDATE transactions SET date = ?1, description = ?2, amount = ?3, kind = ?4, \
         account_id = ?5, category_id = ?6, notes = ?7 WHERE id = ?8",
        rusqlite::params![
            new_date,
            new_description,
            new_amount,
            new_kind.as_str(),
            new_account_id,
            new_category_id,
            new_notes,
            id
        ],
    )?;
    let txn = get(&tx, id)?;
    apply_effect(&tx, &txn, 1.0)?;
    if patch.category_id.is_some() {
        if let Some(category_id) = new_category_id {
            tagger::learn_pattern(&tx, &txn.description, category_id)?;
        }
    }
    tx.commit()?;
    Ok(txn)
}

/// Deletion reverses the transaction's balance effect before removing the
/// row; create-then-delete leaves every balance where it started.
pub fn delete(conn: &mut Connection, id: i64) -> Result<()> {
    let txn = get(conn, id)?;
    let tx = conn.transaction()?;
    apply_effect(&tx, &txn, -1.0)?;
    tx.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing / bulk tag
// ---------------------------------------------------------------------------

pub fn list(conn: &Connection, filters: &TxnFilters) -> Result<Vec<TxnRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.description, t.amount, t.kind, t.account_id, \
         t.payee_account_id, t.category_id, t.loan_id, t.reference, t.notes, t.source, \
         a.name, p.name, c.name \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         LEFT JOIN accounts p ON t.payee_account_id = p.id \
         LEFT JOIN categories c ON t.category_id = c.id \
         WHERE 1=1",
    );
    let mut params: Vec<String> = Vec::new();

    if let Some(account_id) = filters.account_id {
        params.push(account_id.to_string());
        sql.push_str(&format!(
            " AND (t.account_id = ?{n} OR t.payee_account_id = ?{n})",
            n = params.len()
        ));
    }
    if let Some(category_id) = filters.category_id {
        params.push(category_id.to_string());
        sql.push_str(&format!(
            " AND t.category_id IN (SELECT id FROM categories WHERE id = ?{n} OR parent_id = ?{n})",
            n = params.len()
        ));
    }
    if let Some(kind) = filters.kind {
        params.push(kind.as_str().to_string());
        sql.push_str(&format!(" AND t.kind = ?{}", params.len()));
    }
    if let Some(from) = &filters.from_date {
        params.push(validate_date(from)?);
        sql.push_str(&format!(" AND t.date >= ?{}", params.len()));
    }
    if let Some(to) = &filters.to_date {
        params.push(validate_date(to)?);
        sql.push_str(&format!(" AND t.date <= ?{}", params.len()));
    }
    if filters.untagged_only {
        sql.push_str(" AND t.category_id IS NULL AND t.kind != 'transfer'");
    }
    if let Some(search) = &filters.search {
        params.push(format!("%{}%", search.to_lowercase()));
        sql.push_str(&format!(" AND LOWER(t.description) LIKE ?{}", params.len()));
    }
    // Newest first; creation order breaks date ties
    sql.push_str(" ORDER BY t.date DESC, t.id ASC");
    sql.push_str(&format!(" LIMIT {}", filters.limit.unwrap_or(500)));

    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), |row| {
            Ok(TxnRow {
                txn: txn_from_row(row)?,
                account: row.get(12)?,
                payee_account: row.get(13)?,
                category: row.get(14)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Applies one category to a set of transactions. Tags carry no monetary
/// effect, so balances are untouched; each affected description is learned
/// as a tag pattern.
pub fn bulk_tag(conn: &Connection, ids: &[i64], category_id: i64) -> Result<usize> {
    let mut tagged = 0usize;
    for &id in ids {
        let txn = get(conn, id)?;
        validate_category(conn, category_id, txn.kind)?;
        conn.execute(
            "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
            rusqlite::params![category_id, id],
        )?;
        tagger::learn_pattern(conn, &txn.description, category_id)?;
        tagged += 1;
    }
    Ok(tagged)
}
