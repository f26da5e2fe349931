use std::path::Path;

use calamine::{Data, Reader};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::categories;
use crate::error::{KhataError, Result};
use crate::models::{Candidate, CategoryKind, TxnKind};
use crate::tagger;
use crate::transactions::{self, TxnInput};

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Normalize a statement date cell to YYYY-MM-DD. Accepts dd/mm/yy,
/// dd/mm/yyyy and already-ISO strings.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let d: u32 = parts[0].trim().parse().ok()?;
    let m: u32 = parts[1].trim().parse().ok()?;
    let mut y: i32 = parts[2].trim().parse().ok()?;
    if parts[2].trim().len() == 2 {
        y += 2000;
    }
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        _ => String::new(),
    }
}

fn cell_to_date(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => normalize_date(s),
        Data::Float(f) => Some(excel_serial_to_date(*f)),
        Data::Int(i) => Some(excel_serial_to_date(*i as f64)),
        Data::DateTime(dt) => Some(excel_serial_to_date(dt.as_f64())),
        _ => None,
    }
}

fn cell_to_amount(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => {
            let cleaned = s.replace(',', "").replace('\u{20b9}', "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse().ok()
            }
        }
        _ => None,
    }
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Statement parsing
// ---------------------------------------------------------------------------

/// Parsed statement awaiting review: transient candidates plus per-row
/// warnings. Nothing here has been persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatementReview {
    pub source_file: String,
    pub checksum: String,
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<String>,
}

struct ColumnMap {
    date: usize,
    narration: usize,
    withdrawal: usize,
    deposit: usize,
    balance: Option<usize>,
    reference: Option<usize>,
}

fn detect_header(row: &[Data]) -> Option<ColumnMap> {
    let mut date = None;
    let mut narration = None;
    let mut withdrawal = None;
    let mut deposit = None;
    let mut balance = None;
    let mut reference = None;
    for (i, cell) in row.iter().enumerate() {
        let text = cell_to_string(cell);
        if text == "Date" {
            date = Some(i);
        } else if text.contains("Narration") || text.contains("Description") {
            narration = Some(i);
        } else if text.contains("Withdrawal") || text.contains("Debit") {
            withdrawal = Some(i);
        } else if text.contains("Deposit") || text.contains("Credit") {
            deposit = Some(i);
        } else if text.contains("Balance") {
            balance = Some(i);
        } else if text.contains("Ref") {
            reference = Some(i);
        }
    }
    Some(ColumnMap {
        date: date?,
        narration: narration?,
        withdrawal: withdrawal?,
        deposit: deposit?,
        balance,
        reference,
    })
}

/// Parse the fixed statement layout (Date / Narration / Withdrawal /
/// Deposit / Balance) from an XLSX file. Rows with a malformed date or with
/// both or neither amount columns populated are skipped with a warning;
/// separator rows (asterisks, blanks) are ignored.
pub fn parse_statement(conn: &Connection, file_path: &Path) -> Result<StatementReview> {
    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| KhataError::Import(format!("Failed to open statement: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| KhataError::Import("Statement has no sheets".into()))?
        .map_err(|e| KhataError::Import(format!("Failed to read sheet: {e}")))?;
    let rows: Vec<&[Data]> = range.rows().collect();
    let (candidates, warnings) = parse_rows(conn, &rows)?;
    Ok(StatementReview {
        source_file: file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string(),
        checksum: compute_checksum(file_path)?,
        candidates,
        warnings,
    })
}

fn parse_rows(conn: &Connection, rows: &[&[Data]]) -> Result<(Vec<Candidate>, Vec<String>)> {
    let mut columns: Option<ColumnMap> = None;
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        if columns.is_none() {
            if row.iter().any(|c| cell_to_string(c) == "Date")
                && row.iter().any(|c| {
                    let t = cell_to_string(c);
                    t.contains("Narration") || t.contains("Description")
                })
            {
                columns = detect_header(row);
                if columns.is_none() {
                    return Err(KhataError::Import(
                        "Statement header is missing an amount column".into(),
                    ));
                }
            }
            continue;
        }
        let Some(cols) = columns.as_ref() else { continue };
        let Some(date_cell) = row.get(cols.date) else { continue };
        let raw_date = cell_to_string(date_cell);
        // Separator/footer rows
        if raw_date.is_empty() || raw_date.contains('*') {
            continue;
        }
        let Some(date) = cell_to_date(date_cell) else {
            warnings.push(format!("row {row_no}: unreadable date '{raw_date}', skipped"));
            continue;
        };
        let description = row.get(cols.narration).map(cell_to_string).unwrap_or_default();
        let withdrawal = row
            .get(cols.withdrawal)
            .and_then(cell_to_amount)
            .filter(|a| *a > 0.0);
        let deposit = row
            .get(cols.deposit)
            .and_then(cell_to_amount)
            .filter(|a| *a > 0.0);
        let (amount, kind) = match (withdrawal, deposit) {
            (Some(w), None) => (w, TxnKind::Expense),
            (None, Some(d)) => (d, TxnKind::Income),
            (Some(_), Some(_)) => {
                warnings.push(format!(
                    "row {row_no}: both withdrawal and deposit populated, skipped"
                ));
                continue;
            }
            (None, None) => {
                warnings.push(format!(
                    "row {row_no}: neither withdrawal nor deposit populated, skipped"
                ));
                continue;
            }
        };
        let reference = cols
            .reference
            .and_then(|i| row.get(i))
            .map(cell_to_string)
            .filter(|s| !s.is_empty());
        let statement_balance = cols.balance.and_then(|i| row.get(i)).and_then(cell_to_amount);

        // Reapply a learned tag when one fits this row's direction
        let mut category_id = tagger::match_description(conn, &description)?;
        if let Some(id) = category_id {
            let wanted = match kind {
                TxnKind::Expense => CategoryKind::Expense,
                _ => CategoryKind::Income,
            };
            let fits = categories::get_category(conn, id)
                .map(|c| c.kind == wanted)
                .unwrap_or(false);
            if !fits {
                category_id = None;
            }
        }

        candidates.push(Candidate {
            date,
            description,
            amount,
            kind,
            reference,
            category_id,
            statement_balance,
        });
    }

    if columns.is_none() {
        return Err(KhataError::Import(
            "Could not find transaction headers in file".into(),
        ));
    }
    Ok((candidates, warnings))
}

// ---------------------------------------------------------------------------
// Review file round-trip
// ---------------------------------------------------------------------------

pub fn write_review_file(path: &Path, review: &StatementReview) -> Result<()> {
    let json = serde_json::to_string_pretty(review)
        .map_err(|e| KhataError::Import(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn read_review_file(path: &Path) -> Result<StatementReview> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| KhataError::Import(format!("Malformed review file: {e}")))
}

// ---------------------------------------------------------------------------
// save_all
// ---------------------------------------------------------------------------

pub struct SaveResult {
    pub saved: usize,
    pub duplicate_file: bool,
}

/// Persist reviewed candidates into one account through the transaction
/// service (each row's insert and balance effect commit together). A
/// statement whose checksum was already committed for this account is
/// refused as a duplicate.
pub fn save_all(
    conn: &mut Connection,
    review: &StatementReview,
    account_id: i64,
) -> Result<SaveResult> {
    if !review.checksum.is_empty() {
        let mut stmt =
            conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND account_id = ?2")?;
        if stmt.exists(rusqlite::params![review.checksum, account_id])? {
            return Ok(SaveResult { saved: 0, duplicate_file: true });
        }
    }

    let mut saved = 0usize;
    for candidate in &review.candidates {
        transactions::create(
            conn,
            TxnInput {
                date: candidate.date.clone(),
                description: candidate.description.clone(),
                amount: candidate.amount,
                kind: candidate.kind,
                account_id,
                category_id: candidate.category_id,
                loan_id: None,
                reference: candidate.reference.clone(),
                notes: None,
                source: transactions::SOURCE_BANK_IMPORT.into(),
            },
        )?;
        saved += 1;
    }

    let dates: Vec<&str> = review.candidates.iter().map(|c| c.date.as_str()).collect();
    conn.execute(
        "INSERT INTO imports (filename, account_id, record_count, date_range_start, \
         date_range_end, checksum) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            review.source_file,
            account_id,
            saved as i64,
            dates.iter().min().copied(),
            dates.iter().max().copied(),
            review.checksum,
        ],
    )?;

    Ok(SaveResult { saved, duplicate_file: false })
}
