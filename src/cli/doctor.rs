use colored::Colorize;

use crate::error::Result;
use crate::fmt::money;
use crate::ledger;

/// Rebuild every running balance from transaction history and report drift.
pub fn run() -> Result<()> {
    let conn = super::open_authed()?;
    let fixes = ledger::recompute_all_balances(&conn)?;
    if fixes.is_empty() {
        println!("{} All account balances agree with their transactions.", "✓".green());
        return Ok(());
    }
    for fix in &fixes {
        println!(
            "{} {}: stored {} recomputed to {}",
            "fixed".yellow(),
            fix.account,
            money(fix.stored),
            money(fix.computed)
        );
    }
    println!("Repaired {} account balance(s).", fixes.len());
    Ok(())
}
