use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::error::Result;
use crate::models::LedgerEntry;

fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        product_id: row.get(1)?,
        customer_id: row.get(2)?,
        supplier_id: row.get(3)?,
        quantity: row.get(4)?,
        entry_date: row.get(5)?,
        amount: row.get(6)?,
        balance: row.get(7)?,
    })
}

/// Appends one movement: the new entry's balance is the previous entry's
/// balance plus the signed amount. Callers hold the write transaction.
pub(crate) fn append(
    conn: &Connection,
    product_id: i64,
    customer_id: Option<i64>,
    supplier_id: i64,
    quantity: i32,
    amount: f64,
) -> Result<LedgerEntry> {
    let balance = last_balance(conn)? + amount;

    conn.execute(
        "INSERT INTO ledger (product_id, customer_id, supplier_id, quantity, amount, balance)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![product_id, customer_id, supplier_id, quantity, amount, balance],
    )?;
    let id = conn.last_insert_rowid();

    let entry = conn.query_row(
        "SELECT id, product_id, customer_id, supplier_id, quantity, entry_date, amount, balance
         FROM ledger
         WHERE id = ?1",
        [id],
        entry_from_row,
    )?;

    Ok(entry)
}

pub(crate) fn last_balance(conn: &Connection) -> Result<f64> {
    let balance: Option<f64> = conn
        .query_row(
            "SELECT balance FROM ledger ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(balance.unwrap_or(0.0))
}

/// The full audit trail in chronological (id) order.
pub fn entries(db: &Database) -> Result<Vec<LedgerEntry>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, product_id, customer_id, supplier_id, quantity, entry_date, amount, balance
         FROM ledger
         ORDER BY id",
    )?;

    let entries = stmt
        .query_map([], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}
