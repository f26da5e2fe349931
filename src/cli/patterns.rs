use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::tagger;

pub fn list() -> Result<()> {
    let conn = super::open_authed()?;
    let patterns = tagger::list_patterns(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Description", "Category"]);
    for pattern in &patterns {
        table.add_row(vec![
            Cell::new(pattern.id),
            Cell::new(&pattern.pattern),
            Cell::new(&pattern.category),
        ]);
    }
    println!("Auto-tag patterns\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = super::open_authed()?;
    tagger::delete_pattern(&conn, id)?;
    println!("Deleted pattern #{id}");
    Ok(())
}
