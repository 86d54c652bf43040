use std::fs;
use std::path::Path;

use rusqlite::{params, OptionalExtension};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Category;

pub fn list(db: &Database) -> Result<Vec<Category>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, name, image_path, deleted FROM categories WHERE deleted = 0 ORDER BY name",
    )?;

    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                image_path: row.get(2)?,
                deleted: row.get::<_, i64>(3)? != 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(categories)
}

/// Creates a category and writes its uploaded image under `images_dir`.
/// The file is named by the running category count (deleted rows included)
/// so a path never collides with an earlier upload.
pub fn create(db: &Database, name: &str, image: &[u8], images_dir: &Path) -> Result<Category> {
    let conn = db.lock()?;

    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE name = ?1 AND deleted = 0",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(Error::AlreadyExists {
            resource: "category",
            name: name.to_string(),
        });
    }

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    fs::create_dir_all(images_dir)?;
    let path = images_dir.join(format!("{count}.png"));
    fs::write(&path, image)?;
    let image_path = path.to_string_lossy().into_owned();

    conn.execute(
        "INSERT INTO categories (name, image_path) VALUES (?1, ?2)",
        params![name, image_path],
    )?;
    let id = conn.last_insert_rowid();

    Ok(Category {
        id,
        name: name.to_string(),
        image_path,
        deleted: false,
    })
}

/// Soft-deletes the category and every product in it.
pub fn soft_delete(db: &Database, id: i64) -> Result<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let changed = tx.execute(
        "UPDATE categories SET deleted = 1 WHERE id = ?1 AND deleted = 0",
        [id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound {
            resource: "category",
            id,
        });
    }

    tx.execute("UPDATE products SET deleted = 1 WHERE category_id = ?1", [id])?;

    tx.commit()?;
    Ok(())
}
