use std::path::Path;

use crate::error::Result;
use crate::exporter;

pub fn transactions(out: &str, from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let written = exporter::export_transactions(&conn, Path::new(out), from_date, to_date)?;
    println!("Exported {written} transaction(s) to {out}");
    Ok(())
}

pub fn balance_sheet(out: &str) -> Result<()> {
    let conn = super::open_authed()?;
    exporter::export_balance_sheet(&conn, Path::new(out))?;
    println!("Exported balance sheet to {out}");
    Ok(())
}
