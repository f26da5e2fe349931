use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::db;
use crate::error::{KhataError, Result};

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn is_setup(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT count(*) FROM users", [], |r| r.get(0))?;
    Ok(count > 0)
}

/// First-run password setup. Fails once a password exists; use
/// `change_password` after that.
pub fn setup_password(conn: &Connection, password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(KhataError::Validation("Password must not be empty".into()));
    }
    if is_setup(conn)? {
        return Err(KhataError::Conflict("Password already set".into()));
    }
    conn.execute(
        "INSERT INTO users (password_hash) VALUES (?1)",
        [hash_password(password)],
    )?;
    open_session(conn)
}

pub fn login(conn: &Connection, password: &str) -> Result<String> {
    let stored: Option<String> = conn
        .query_row("SELECT password_hash FROM users LIMIT 1", [], |r| r.get(0))
        .optional()?;
    let Some(stored) = stored else {
        return Err(KhataError::Auth(
            "No password set. Run `khata setup` first.".into(),
        ));
    };
    if stored != hash_password(password) {
        return Err(KhataError::Auth("Invalid password".into()));
    }
    open_session(conn)
}

fn open_session(conn: &Connection) -> Result<String> {
    let token = generate_token();
    conn.execute("INSERT INTO sessions (token) VALUES (?1)", [&token])?;
    Ok(token)
}

pub fn logout(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
    Ok(())
}

/// Gate for every data operation: the saved token must match a live session.
pub fn require_session(conn: &Connection, token: Option<&str>) -> Result<()> {
    let Some(token) = token else {
        return Err(KhataError::Auth(
            "Not logged in. Run `khata login` first.".into(),
        ));
    };
    let known: Option<String> = conn
        .query_row("SELECT token FROM sessions WHERE token = ?1", [token], |r| r.get(0))
        .optional()?;
    if known.is_none() {
        return Err(KhataError::Auth(
            "Session expired. Please login again.".into(),
        ));
    }
    Ok(())
}

pub fn change_password(conn: &Connection, current: &str, new: &str) -> Result<()> {
    if new.is_empty() {
        return Err(KhataError::Validation("New password must not be empty".into()));
    }
    let stored: Option<String> = conn
        .query_row("SELECT password_hash FROM users LIMIT 1", [], |r| r.get(0))
        .optional()?;
    let Some(stored) = stored else {
        return Err(KhataError::Auth(
            "No password set. Run `khata setup` first.".into(),
        ));
    };
    if stored != hash_password(current) {
        return Err(KhataError::Auth("Current password is incorrect".into()));
    }
    conn.execute("UPDATE users SET password_hash = ?1", [hash_password(new)])?;
    Ok(())
}

/// Wipe every domain table but keep credentials and live sessions, then
/// reseed the default categories and Cash ledger.
pub fn reset_all_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM transactions;
         DELETE FROM imports;
         DELETE FROM tag_patterns;
         DELETE FROM loan_repayments;
         DELETE FROM loans;
         DELETE FROM accounts;
         DELETE FROM categories;",
    )?;
    db::seed_defaults(conn)
}
