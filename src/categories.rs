use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{KhataError, Result};
use crate::models::{Category, CategoryKind};

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: CategoryKind::parse(&row.get::<_, String>(2)?)
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        parent_id: row.get(3)?,
    })
}

pub fn create_category(
    conn: &Connection,
    name: &str,
    kind: CategoryKind,
    parent_id: Option<i64>,
) -> Result<Category> {
    if name.trim().is_empty() {
        return Err(KhataError::Validation("Category name must not be empty".into()));
    }
    if let Some(pid) = parent_id {
        let parent = get_category(conn, pid)?;
        if parent.kind != kind {
            return Err(KhataError::Validation(format!(
                "Parent category '{}' is {}, not {}",
                parent.name,
                parent.kind.as_str(),
                kind.as_str()
            )));
        }
        // One level of nesting only
        if parent.parent_id.is_some() {
            return Err(KhataError::Validation(format!(
                "'{}' is already a sub-category and cannot have children",
                parent.name
            )));
        }
    }
    conn.execute(
        "INSERT INTO categories (name, kind, parent_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![name.trim(), kind.as_str(), parent_id],
    )?;
    get_category(conn, conn.last_insert_rowid())
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, kind, parent_id FROM categories WHERE id = ?1",
        [id],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound("Category".into()))
}

pub fn get_category_by_name(conn: &Connection, name: &str) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, kind, parent_id FROM categories WHERE name = ?1",
        [name],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| KhataError::NotFound(format!("Category '{name}'")))
}

pub fn list_categories(conn: &Connection, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
    let mut sql =
        String::from("SELECT id, name, kind, parent_id FROM categories WHERE 1=1");
    let mut params: Vec<String> = Vec::new();
    if let Some(k) = kind {
        params.push(k.as_str().to_string());
        sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }
    sql.push_str(" ORDER BY kind, COALESCE(parent_id, id), parent_id IS NOT NULL, name");
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Deleting a category that transactions still reference (directly or via a
/// child) is blocked. Learned tag patterns pointing at it are dropped along
/// with it — they are hints, not records.
pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    get_category(conn, id)?;
    let in_use: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE category_id IN \
         (SELECT id FROM categories WHERE id = ?1 OR parent_id = ?1)",
        [id],
        |r| r.get(0),
    )?;
    if in_use > 0 {
        return Err(KhataError::Conflict(format!(
            "Category is referenced by {in_use} transaction(s)"
        )));
    }
    conn.execute(
        "DELETE FROM tag_patterns WHERE category_id IN \
         (SELECT id FROM categories WHERE id = ?1 OR parent_id = ?1)",
        [id],
    )?;
    conn.execute("DELETE FROM categories WHERE parent_id = ?1", [id])?;
    conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    Ok(())
}
