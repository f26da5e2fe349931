use rusqlite::Connection;

use crate::error::{KhataError, Result};

/// Look up a category for a transaction description: case-insensitive exact
/// match of the full description against saved patterns, oldest pattern
/// first. This recognizes repeated transactions, nothing fuzzier.
pub fn match_description(conn: &Connection, description: &str) -> Result<Option<i64>> {
    let needle = description.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(None);
    }
    let mut stmt = conn.prepare("SELECT pattern, category_id FROM tag_patterns ORDER BY id")?;
    let patterns: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (pattern, category_id) in patterns {
        if pattern.to_lowercase() == needle {
            return Ok(Some(category_id));
        }
    }
    Ok(None)
}

/// Remember a description → category pairing. The first saved pattern for a
/// description wins; later tagging of the same text is a no-op.
pub fn learn_pattern(conn: &Connection, description: &str, category_id: i64) -> Result<()> {
    let pattern = description.trim();
    if pattern.is_empty() {
        return Ok(());
    }
    conn.execute(
        "INSERT OR IGNORE INTO tag_patterns (pattern, category_id) VALUES (?1, ?2)",
        rusqlite::params![pattern, category_id],
    )?;
    Ok(())
}

pub struct PatternRow {
    pub id: i64,
    pub pattern: String,
    pub category: String,
}

pub fn list_patterns(conn: &Connection) -> Result<Vec<PatternRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.pattern, c.name FROM tag_patterns p \
         JOIN categories c ON p.category_id = c.id ORDER BY p.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PatternRow {
                id: row.get(0)?,
                pattern: row.get(1)?,
                category: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete_pattern(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM tag_patterns WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(KhataError::NotFound("Tag pattern".into()));
    }
    Ok(())
}
