use rusqlite::params;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewSupplier, Supplier};

fn supplier_from_row(row: &rusqlite::Row) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        id: row.get(0)?,
        company: row.get(1)?,
        tax_id: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        city: row.get(6)?,
        province: row.get(7)?,
        joined_on: row.get(8)?,
        deleted: row.get::<_, i64>(9)? != 0,
    })
}

pub fn list(db: &Database) -> Result<Vec<Supplier>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, company, tax_id, phone, email, address, city, province, joined_on, deleted
         FROM suppliers
         WHERE deleted = 0
         ORDER BY company",
    )?;

    let suppliers = stmt
        .query_map([], supplier_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(suppliers)
}

pub fn create(db: &Database, supplier: NewSupplier) -> Result<Supplier> {
    let conn = db.lock()?;

    conn.execute(
        "INSERT INTO suppliers (company, tax_id, phone, email, address, city, province)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            supplier.company,
            supplier.tax_id,
            supplier.phone,
            supplier.email,
            supplier.address,
            supplier.city,
            supplier.province,
        ],
    )?;
    let id = conn.last_insert_rowid();

    let supplier = conn.query_row(
        "SELECT id, company, tax_id, phone, email, address, city, province, joined_on, deleted
         FROM suppliers
         WHERE id = ?1",
        [id],
        supplier_from_row,
    )?;

    Ok(supplier)
}

/// Soft-deletes the supplier and every product it supplies.
pub fn soft_delete(db: &Database, id: i64) -> Result<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let changed = tx.execute(
        "UPDATE suppliers SET deleted = 1 WHERE id = ?1 AND deleted = 0",
        [id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound {
            resource: "supplier",
            id,
        });
    }

    tx.execute("UPDATE products SET deleted = 1 WHERE supplier_id = ?1", [id])?;

    tx.commit()?;
    Ok(())
}
