use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{KhataError, Result};
use crate::ledger;
use crate::models::{InterestMode, Loan, LoanKind};
use crate::transactions::validate_date;

fn loan_from_row(row: &Row) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get(0)?,
        person_name: row.get(1)?,
        kind: LoanKind::parse(&row.get::<_, String>(2)?)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        principal: row.get(3)?,
        interest_rate: row.get(4)?,
        start_date: row.get(5)?,
        total_repaid: row.get(6)?,
        interest_paid: row.get(7)?,
        account_id: row.get(8)?,
        notes: row.get(9)?,
    })
}

const LOAN_COLS: &str = "id, person_name, kind, principal, interest_rate, start_date, \
                         total_repaid, interest_paid, account_id, notes";

/// Creates the loan and its linked ledger account (loan_receivable or
/// loan_payable, opening balance = principal) in one write.
pub fn create_loan(
    conn: &mut Connection,
    person_name: &str,
    kind: LoanKind,
    principal: f64,
    interest_rate: f64,
    start_date: &str,
    notes: Option<&str>,
) -> Result<Loan> {
    if person_name.trim().is_empty() {
        return Err(KhataError::Validation("Person name must not be empty".into()));
    }
    if principal < 0.0 || !principal.is_finite() {
        return Err(KhataError::Validation("Principal must not be negative".into()));
    }
    if interest_rate < 0.0 || !interest_rate.is_finite() {
        return Err(KhataError::Validation("Interest rate must not be negative".into()));
    }
    let start_date = validate_date(start_date)?;

    let tx = conn.transaction()?;
    let category = kind.account_category();
    let description = format!("Loan {} to/from {}", kind.as_str(), person_name.trim());
    let account = ledger::create_account(
        &tx,
        &format!("Loan - {}", person_name.trim()),
        category.default_kind(),
        category,
        principal,
        Some(person_name.trim()),
        Some(description.as_str()),
    )?;
    tx.execute(
        "INSERT INTO loans (person_name, kind, principal, interest_rate, start_date, account_id, notes) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            person_name.trim(),
            kind.as_str(),
            principal,
            interest_rate,
            start_date,
            account.id,
            notes
        ],
    )?;
    let loan = get_loan(&tx, tx.last_insert_rowid())?;
    tx.commit()?;
    Ok(loan)
}

pub fn get_loan(conn: &Connection, id: i64) -> Result<Loan> {
    conn.query_row(
        &format!("SELECT {LOAN_COLS} FROM loans WHERE id = ?1"),
        [id],
        loan_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound("Loan".into()))
}

pub fn list_loans(conn: &Connection, kind: Option<LoanKind>) -> Result<Vec<Loan>> {
    let mut sql = format!("SELECT {LOAN_COLS} FROM loans WHERE 1=1");
    let mut params: Vec<String> = Vec::new();
    if let Some(k) = kind {
        params.push(k.as_str().to_string());
        sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }
    sql.push_str(" ORDER BY person_name, id");
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), loan_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Appends a repayment and rolls it into the loan's totals. Principal
/// repayments beyond the outstanding amount are recorded as-is — the caller
/// decides whether to warn.
pub fn record_repayment(
    conn: &mut Connection,
    loan_id: i64,
    amount: f64,
    date: &str,
    is_interest: bool,
) -> Result<Loan> {
    if !(amount > 0.0) || !amount.is_finite() {
        return Err(KhataError::Validation("Repayment amount must be greater than zero".into()));
    }
    let date = validate_date(date)?;
    get_loan(conn, loan_id)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO loan_repayments (loan_id, date, amount, is_interest) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![loan_id, date, amount, is_interest],
    )?;
    let column = if is_interest { "interest_paid" } else { "total_repaid" };
    tx.execute(
        &format!("UPDATE loans SET {column} = {column} + ?1 WHERE id = ?2"),
        rusqlite::params![amount, loan_id],
    )?;
    let loan = get_loan(&tx, loan_id)?;
    tx.commit()?;
    Ok(loan)
}

pub struct RepaymentRow {
    pub id: i64,
    pub date: String,
    pub amount: f64,
    pub is_interest: bool,
}

pub fn list_repayments(conn: &Connection, loan_id: i64) -> Result<Vec<RepaymentRow>> {
    get_loan(conn, loan_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, date, amount, is_interest FROM loan_repayments \
         WHERE loan_id = ?1 ORDER BY date, id",
    )?;
    let rows = stmt
        .query_map([loan_id], |row| {
            Ok(RepaymentRow {
                id: row.get(0)?,
                date: row.get(1)?,
                amount: row.get(2)?,
                is_interest: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Interest
// ---------------------------------------------------------------------------

fn days_elapsed(start_date: &str, as_of: NaiveDate) -> Result<i64> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").map_err(|_| {
        KhataError::Validation(format!("Invalid loan start date '{start_date}'"))
    })?;
    Ok(as_of.signed_duration_since(start).num_days().max(0))
}

/// Interest accrued from the start date to `as_of`, computed on demand.
/// Simple mode is annual-rate pro-rata on actual/365; compound mode
/// compounds daily at rate/365. Dates before the start accrue nothing.
pub fn accrued_interest(loan: &Loan, as_of: NaiveDate, mode: InterestMode) -> Result<f64> {
    let days = days_elapsed(&loan.start_date, as_of)?;
    if days == 0 || loan.interest_rate == 0.0 {
        return Ok(0.0);
    }
    let rate = loan.interest_rate / 100.0;
    let accrued = match mode {
        InterestMode::Simple => loan.principal * rate * (days as f64 / 365.0),
        InterestMode::Compound => {
            loan.principal * ((1.0 + rate / 365.0).powi(days as i32) - 1.0)
        }
    };
    Ok(accrued)
}

pub struct InterestSummary {
    pub principal: f64,
    pub outstanding_principal: f64,
    pub interest_rate: f64,
    pub days_elapsed: i64,
    pub accrued_interest: f64,
    pub interest_paid: f64,
    pub interest_due: f64,
    pub total_due: f64,
}

pub fn interest_summary(loan: &Loan, as_of: NaiveDate, mode: InterestMode) -> Result<InterestSummary> {
    let accrued = accrued_interest(loan, as_of, mode)?;
    let outstanding = loan.outstanding();
    Ok(InterestSummary {
        principal: loan.principal,
        outstanding_principal: outstanding,
        interest_rate: loan.interest_rate,
        days_elapsed: days_elapsed(&loan.start_date, as_of)?,
        accrued_interest: accrued,
        interest_paid: loan.interest_paid,
        interest_due: (accrued - loan.interest_paid).max(0.0),
        total_due: (outstanding + accrued - loan.interest_paid).max(0.0),
    })
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct LoanPatch {
    pub person_name: Option<String>,
    pub principal: Option<f64>,
    pub interest_rate: Option<f64>,
    pub notes: Option<String>,
}

/// Edits loan fields, keeping the linked account in step: a renamed person
/// renames the account, a changed principal shifts its opening balance.
pub fn update_loan(conn: &mut Connection, id: i64, patch: LoanPatch) -> Result<Loan> {
    let loan = get_loan(conn, id)?;
    if let Some(rate) = patch.interest_rate {
        if rate < 0.0 || !rate.is_finite() {
            return Err(KhataError::Validation("Interest rate must not be negative".into()));
        }
    }
    if let Some(principal) = patch.principal {
        if principal < 0.0 || !principal.is_finite() {
            return Err(KhataError::Validation("Principal must not be negative".into()));
        }
    }
    if let Some(person) = &patch.person_name {
        if person.trim().is_empty() {
            return Err(KhataError::Validation("Person name must not be empty".into()));
        }
    }

    let tx = conn.transaction()?;
    if let Some(person) = &patch.person_name {
        tx.execute(
            "UPDATE loans SET person_name = ?1 WHERE id = ?2",
            rusqlite::params![person.trim(), id],
        )?;
        if let Some(account_id) = loan.account_id {
            tx.execute(
                "UPDATE accounts SET name = ?1, person_name = ?2 WHERE id = ?3",
                rusqlite::params![format!("Loan - {}", person.trim()), person.trim(), account_id],
            )?;
        }
    }
    if let Some(principal) = patch.principal {
        tx.execute(
            "UPDATE loans SET principal = ?1 WHERE id = ?2",
            rusqlite::params![principal, id],
        )?;
        if let Some(account_id) = loan.account_id {
            ledger::update_account(&tx, account_id, None, Some(principal), None)?;
        }
    }
    if let Some(rate) = patch.interest_rate {
        tx.execute(
            "UPDATE loans SET interest_rate = ?1 WHERE id = ?2",
            rusqlite::params![rate, id],
        )?;
    }
    if let Some(notes) = &patch.notes {
        tx.execute(
            "UPDATE loans SET notes = ?1 WHERE id = ?2",
            rusqlite::params![notes, id],
        )?;
    }
    let loan = get_loan(&tx, id)?;
    tx.commit()?;
    Ok(loan)
}

/// Removes the loan, its repayments, and its linked account. Blocked when
/// transactions reference the loan or its account.
pub fn delete_loan(conn: &mut Connection, id: i64) -> Result<()> {
    let loan = get_loan(conn, id)?;
    let linked: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE loan_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    if linked > 0 {
        return Err(KhataError::Conflict(format!(
            "Loan has {linked} linked transaction(s); delete them first"
        )));
    }
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM loan_repayments WHERE loan_id = ?1", [id])?;
    tx.execute("DELETE FROM loans WHERE id = ?1", [id])?;
    if let Some(account_id) = loan.account_id {
        ledger::delete_account(&tx, account_id)?;
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{AccountCategory, AccountKind};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_loan(conn: &mut Connection) -> Loan {
        create_loan(conn, "Ravi", LoanKind::Given, 10000.0, 12.0, "2025-01-01", None).unwrap()
    }

    #[test]
    fn test_create_loan_links_account() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let account = ledger::get_account(&conn, loan.account_id.unwrap()).unwrap();
        assert_eq!(account.name, "Loan - Ravi");
        assert_eq!(account.kind, AccountKind::Asset);
        assert_eq!(account.category, AccountCategory::LoanReceivable);
        assert_eq!(account.opening_balance, 10000.0);
        assert_eq!(account.current_balance, 10000.0);
        assert_eq!(account.person_name.as_deref(), Some("Ravi"));
    }

    #[test]
    fn test_taken_loan_is_payable() {
        let (_dir, mut conn) = test_db();
        let loan =
            create_loan(&mut conn, "Bank", LoanKind::Taken, 50000.0, 9.5, "2025-06-01", None)
                .unwrap();
        let account = ledger::get_account(&conn, loan.account_id.unwrap()).unwrap();
        assert_eq!(account.kind, AccountKind::Liability);
        assert_eq!(account.category, AccountCategory::LoanPayable);
    }

    #[test]
    fn test_create_loan_validation() {
        let (_dir, mut conn) = test_db();
        assert!(matches!(
            create_loan(&mut conn, "Ravi", LoanKind::Given, -1.0, 12.0, "2025-01-01", None),
            Err(KhataError::Validation(_))
        ));
        assert!(matches!(
            create_loan(&mut conn, "Ravi", LoanKind::Given, 100.0, -2.0, "2025-01-01", None),
            Err(KhataError::Validation(_))
        ));
        assert!(matches!(
            create_loan(&mut conn, "Ravi", LoanKind::Given, 100.0, 2.0, "01/01/2025", None),
            Err(KhataError::Validation(_))
        ));
        // Failed creations leave no stray accounts behind
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM accounts WHERE category LIKE 'loan%'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_simple_interest_one_year() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        // 10,000 at 12% simple, 365 days
        let accrued = accrued_interest(&loan, date("2026-01-01"), InterestMode::Simple).unwrap();
        assert!((accrued - 1200.0).abs() < 1e-6, "got {accrued}");
    }

    #[test]
    fn test_interest_zero_days() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        for mode in [InterestMode::Simple, InterestMode::Compound] {
            assert_eq!(accrued_interest(&loan, date("2025-01-01"), mode).unwrap(), 0.0);
            // Before the start date: zero, never negative
            assert_eq!(accrued_interest(&loan, date("2024-06-01"), mode).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_interest_monotonic() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        for mode in [InterestMode::Simple, InterestMode::Compound] {
            let mut prev = 0.0;
            for as_of in ["2025-01-02", "2025-03-01", "2025-12-31", "2027-01-01"] {
                let accrued = accrued_interest(&loan, date(as_of), mode).unwrap();
                assert!(accrued >= prev, "{mode:?} not monotonic at {as_of}");
                prev = accrued;
            }
        }
    }

    #[test]
    fn test_compound_exceeds_simple() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let simple = accrued_interest(&loan, date("2026-01-01"), InterestMode::Simple).unwrap();
        let compound = accrued_interest(&loan, date("2026-01-01"), InterestMode::Compound).unwrap();
        assert!(compound > simple, "daily compounding {compound} <= simple {simple}");
        // Daily compounding at 12% for a year lands near 12.74%
        assert!((compound - 1274.0).abs() < 5.0, "got {compound}");
    }

    #[test]
    fn test_zero_rate_accrues_nothing() {
        let (_dir, mut conn) = test_db();
        let loan =
            create_loan(&mut conn, "Amma", LoanKind::Given, 5000.0, 0.0, "2025-01-01", None)
                .unwrap();
        let accrued = accrued_interest(&loan, date("2026-01-01"), InterestMode::Compound).unwrap();
        assert_eq!(accrued, 0.0);
    }

    #[test]
    fn test_repayments_accumulate() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let loan = record_repayment(&mut conn, loan.id, 3000.0, "2025-04-01", false).unwrap();
        assert_eq!(loan.total_repaid, 3000.0);
        assert_eq!(loan.outstanding(), 7000.0);
        let loan = record_repayment(&mut conn, loan.id, 600.0, "2025-04-01", true).unwrap();
        assert_eq!(loan.interest_paid, 600.0);
        assert_eq!(loan.total_repaid, 3000.0);
        let rows = list_repayments(&conn, loan.id).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].is_interest);
    }

    #[test]
    fn test_over_repayment_allowed_through() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let loan = record_repayment(&mut conn, loan.id, 12000.0, "2025-04-01", false).unwrap();
        assert_eq!(loan.total_repaid, 12000.0);
        assert_eq!(loan.outstanding(), -2000.0);
    }

    #[test]
    fn test_repayment_validation() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        assert!(matches!(
            record_repayment(&mut conn, loan.id, 0.0, "2025-04-01", false),
            Err(KhataError::Validation(_))
        ));
        assert!(matches!(
            record_repayment(&mut conn, 999, 100.0, "2025-04-01", false),
            Err(KhataError::NotFound(_))
        ));
    }

    #[test]
    fn test_interest_summary_totals() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        record_repayment(&mut conn, loan.id, 4000.0, "2025-06-01", false).unwrap();
        record_repayment(&mut conn, loan.id, 500.0, "2025-06-01", true).unwrap();
        let loan = get_loan(&conn, loan.id).unwrap();
        let summary = interest_summary(&loan, date("2026-01-01"), InterestMode::Simple).unwrap();
        assert_eq!(summary.days_elapsed, 365);
        assert_eq!(summary.outstanding_principal, 6000.0);
        assert!((summary.interest_due - 700.0).abs() < 1e-6);
        assert!((summary.total_due - 6700.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_loan_syncs_account() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let loan = update_loan(
            &mut conn,
            loan.id,
            LoanPatch {
                person_name: Some("Ravi Kumar".into()),
                principal: Some(15000.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(loan.person_name, "Ravi Kumar");
        assert_eq!(loan.principal, 15000.0);
        let account = ledger::get_account(&conn, loan.account_id.unwrap()).unwrap();
        assert_eq!(account.name, "Loan - Ravi Kumar");
        assert_eq!(account.opening_balance, 15000.0);
        assert_eq!(account.current_balance, 15000.0);
    }

    #[test]
    fn test_delete_loan_removes_account_and_repayments() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        record_repayment(&mut conn, loan.id, 100.0, "2025-02-01", false).unwrap();
        let account_id = loan.account_id.unwrap();
        delete_loan(&mut conn, loan.id).unwrap();
        assert!(get_loan(&conn, loan.id).is_err());
        assert!(ledger::get_account(&conn, account_id).is_err());
        let repayments: i64 = conn
            .query_row("SELECT count(*) FROM loan_repayments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(repayments, 0);
    }

    #[test]
    fn test_delete_loan_blocked_by_linked_transactions() {
        let (_dir, mut conn) = test_db();
        let loan = sample_loan(&mut conn);
        let cash = ledger::get_or_create_cash(&conn).unwrap();
        conn.execute(
            "INSERT INTO transactions (date, description, amount, kind, account_id, loan_id) \
             VALUES ('2025-02-01', 'Part repayment', 100.0, 'income', ?1, ?2)",
            [cash.id, loan.id],
        )
        .unwrap();
        let err = delete_loan(&mut conn, loan.id).unwrap_err();
        assert!(matches!(err, KhataError::Conflict(_)));
    }
}
