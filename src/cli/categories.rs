use comfy_table::{Cell, Table};

use crate::categories;
use crate::error::Result;
use crate::models::CategoryKind;

pub fn add(name: &str, kind: &str, parent: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let kind = CategoryKind::parse(kind)?;
    let parent_id = parent
        .map(|p| categories::get_category_by_name(&conn, p).map(|c| c.id))
        .transpose()?;
    let category = categories::create_category(&conn, name, kind, parent_id)?;
    match parent {
        Some(parent) => println!("Added sub-category: {parent} > {}", category.name),
        None => println!("Added category: {} ({})", category.name, category.kind.as_str()),
    }
    Ok(())
}

pub fn list(kind: Option<&str>) -> Result<()> {
    let conn = super::open_authed()?;
    let kind = kind.map(CategoryKind::parse).transpose()?;
    let all = categories::list_categories(&conn, kind)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind"]);
    for category in &all {
        let name = if category.parent_id.is_some() {
            format!("  {}", category.name)
        } else {
            category.name.clone()
        };
        table.add_row(vec![
            Cell::new(category.id),
            Cell::new(name),
            Cell::new(category.kind.as_str()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn delete(name: &str) -> Result<()> {
    let conn = super::open_authed()?;
    let category = categories::get_category_by_name(&conn, name)?;
    categories::delete_category(&conn, category.id)?;
    println!("Deleted category: {name}");
    Ok(())
}
