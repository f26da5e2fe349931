use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    password_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    opening_balance REAL NOT NULL DEFAULT 0,
    current_balance REAL NOT NULL DEFAULT 0,
    person_name TEXT,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    parent_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS loans (
    id INTEGER PRIMARY KEY,
    person_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    principal REAL NOT NULL,
    interest_rate REAL NOT NULL DEFAULT 0,
    start_date TEXT NOT NULL,
    total_repaid REAL NOT NULL DEFAULT 0,
    interest_paid REAL NOT NULL DEFAULT 0,
    account_id INTEGER,
    notes TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS loan_repayments (
    id INTEGER PRIMARY KEY,
    loan_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    is_interest INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (loan_id) REFERENCES loans(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    kind TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    payee_account_id INTEGER,
    category_id INTEGER,
    loan_id INTEGER,
    reference TEXT,
    notes TEXT,
    source TEXT NOT NULL DEFAULT 'manual',
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (payee_account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (loan_id) REFERENCES loans(id)
);
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);

CREATE TABLE IF NOT EXISTS tag_patterns (
    id INTEGER PRIMARY KEY,
    pattern TEXT NOT NULL UNIQUE,
    category_id INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
";

// (name, kind)
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    // Expenses
    ("Personal", "expense"),
    ("Food & Dining", "expense"),
    ("Transport", "expense"),
    ("Utilities", "expense"),
    ("Shopping", "expense"),
    ("Entertainment", "expense"),
    ("Health", "expense"),
    ("Education", "expense"),
    ("Rent", "expense"),
    ("Interest Paid", "expense"),
    ("Other Expense", "expense"),
    // Income
    ("Salary", "income"),
    ("Interest Received", "income"),
    ("Investment Returns", "income"),
    ("Other Income", "income"),
];

// (name, parent name) — one level of nesting only
const DEFAULT_SUBCATEGORIES: &[(&str, &str)] = &[
    ("Uber/Ola", "Personal"),
    ("Subscription", "Personal"),
    ("Grooming", "Personal"),
    ("Restaurants", "Food & Dining"),
    ("Groceries", "Food & Dining"),
    ("Zomato/Swiggy", "Food & Dining"),
    ("Electricity", "Utilities"),
    ("Internet", "Utilities"),
    ("Water", "Utilities"),
    ("Gas", "Utilities"),
    ("Mobile Recharge", "Utilities"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_defaults(conn)
}

/// Seed the default category tree and the Cash ledger. Idempotent; also
/// reused by reset-all-data after the domain tables are wiped.
pub fn seed_defaults(conn: &Connection) -> Result<()> {
    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for (name, kind) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, kind) VALUES (?1, ?2)",
                rusqlite::params![name, kind],
            )?;
        }
        for (name, parent) in DEFAULT_SUBCATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, kind, parent_id) \
                 SELECT ?1, kind, id FROM categories WHERE name = ?2 AND parent_id IS NULL",
                rusqlite::params![name, parent],
            )?;
        }
    }

    let cash: i64 = conn.query_row(
        "SELECT count(*) FROM accounts WHERE category = 'cash'",
        [],
        |row| row.get(0),
    )?;
    if cash == 0 {
        conn.execute(
            "INSERT INTO accounts (name, kind, category, description) \
             VALUES ('Cash', 'asset', 'cash', 'Cash in hand')",
            [],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "users", "sessions", "accounts", "categories", "transactions", "loans",
            "loan_repayments", "tag_patterns", "imports",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let cash: i64 = conn
            .query_row("SELECT count(*) FROM accounts WHERE category = 'cash'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(cash, 1);
    }

    #[test]
    fn test_init_db_seeds_categories() {
        let (_dir, conn) = test_db();
        let income: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE kind = 'income'", [], |r| r.get(0))
            .unwrap();
        let expense: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE kind = 'expense'", [], |r| r.get(0))
            .unwrap();
        assert!(income >= 4, "expected >= 4 income categories, got {income}");
        assert!(expense >= 11, "expected >= 11 expense categories, got {expense}");
    }

    #[test]
    fn test_subcategories_inherit_parent_kind() {
        let (_dir, conn) = test_db();
        let kind: String = conn
            .query_row(
                "SELECT kind FROM categories WHERE name = 'Zomato/Swiggy'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(kind, "expense");
        let parent: Option<i64> = conn
            .query_row(
                "SELECT parent_id FROM categories WHERE name = 'Zomato/Swiggy'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(parent.is_some());
    }

    #[test]
    fn test_init_db_seeds_cash_account() {
        let (_dir, conn) = test_db();
        let (kind, category): (String, String) = conn
            .query_row(
                "SELECT kind, category FROM accounts WHERE name = 'Cash'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "asset");
        assert_eq!(category, "cash");
    }
}
