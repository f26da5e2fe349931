use colored::Colorize;
use zeroize::Zeroize;

use crate::auth;
use crate::error::{KhataError, Result};
use crate::settings;

fn prompt(label: &str) -> Result<String> {
    rpassword::prompt_password(label).map_err(KhataError::Io)
}

pub fn setup() -> Result<()> {
    let conn = super::open_db()?;
    if auth::is_setup(&conn)? {
        return Err(KhataError::Conflict(
            "Password already set. Use `khata passwd` to change it.".into(),
        ));
    }
    let mut password = prompt("Choose a password: ")?;
    let mut confirm = prompt("Confirm password: ")?;
    let matched = password == confirm;
    confirm.zeroize();
    if !matched {
        password.zeroize();
        return Err(KhataError::Validation("Passwords do not match".into()));
    }
    let token = auth::setup_password(&conn, &password);
    password.zeroize();
    settings::save_session_token(&token?)?;
    println!("{} Setup complete — you are logged in.", "✓".green());
    Ok(())
}

pub fn login() -> Result<()> {
    let conn = super::open_db()?;
    let mut password = prompt("Password: ")?;
    let token = auth::login(&conn, &password);
    password.zeroize();
    settings::save_session_token(&token?)?;
    println!("{} Logged in.", "✓".green());
    Ok(())
}

pub fn logout() -> Result<()> {
    let conn = super::open_db()?;
    if let Some(token) = settings::load_session_token() {
        auth::logout(&conn, &token)?;
    }
    settings::clear_session_token()?;
    println!("Logged out.");
    Ok(())
}

pub fn passwd() -> Result<()> {
    let conn = super::open_authed()?;
    let mut current = prompt("Current password: ")?;
    let mut new = prompt("New password: ")?;
    let mut confirm = prompt("Confirm new password: ")?;
    let matched = new == confirm;
    confirm.zeroize();
    if !matched {
        current.zeroize();
        new.zeroize();
        return Err(KhataError::Validation("Passwords do not match".into()));
    }
    let result = auth::change_password(&conn, &current, &new);
    current.zeroize();
    new.zeroize();
    result?;
    println!("{} Password changed.", "✓".green());
    Ok(())
}

pub fn reset(yes: bool) -> Result<()> {
    let conn = super::open_authed()?;
    if !yes {
        println!(
            "{} This deletes every account, transaction, loan and pattern.",
            "Warning:".yellow().bold()
        );
        println!("Re-run as `khata reset --yes` to confirm.");
        return Ok(());
    }
    auth::reset_all_data(&conn)?;
    println!("All data reset. Default categories and the Cash ledger were recreated.");
    Ok(())
}
