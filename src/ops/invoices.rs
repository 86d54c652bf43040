use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{round2, Invoice, InvoiceView, OrderLine, Viewer};
use crate::ops::{ledger, products};

/// Converts a pending order into an invoice, all-or-nothing.
///
/// Every line is booked in the accounting ledger at the product's current
/// tax-inclusive price, attributed to the order's customer and the product's
/// supplier; the item list is then frozen onto the invoice and the order
/// deleted. A missing line product aborts the conversion and the transaction
/// rolls back with nothing committed.
pub fn from_order(db: &Database, order_id: i64) -> Result<InvoiceView> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let customer_id: Option<i64> = tx
        .query_row(
            "SELECT customer_id FROM orders WHERE id = ?1",
            [order_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(customer_id) = customer_id else {
        return Err(Error::NotFound {
            resource: "order",
            id: order_id,
        });
    };

    let items = {
        let mut stmt = tx.prepare(
            "SELECT product_id, quantity FROM order_items WHERE order_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([order_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i32>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    for (product_id, quantity) in &items {
        let product = products::active(&tx, *product_id)?;
        ledger::append(
            &tx,
            product.id,
            Some(customer_id),
            product.supplier_id,
            *quantity,
            product.final_price * *quantity as f64,
        )?;
    }

    tx.execute("INSERT INTO invoices (customer_id) VALUES (?1)", [customer_id])?;
    let invoice_id = tx.last_insert_rowid();
    for (product_id, quantity) in &items {
        tx.execute(
            "INSERT INTO invoice_items (invoice_id, product_id, quantity) VALUES (?1, ?2, ?3)",
            params![invoice_id, product_id, quantity],
        )?;
    }

    tx.execute("DELETE FROM order_items WHERE order_id = ?1", [order_id])?;
    tx.execute("DELETE FROM orders WHERE id = ?1", [order_id])?;

    let created = view(&tx, invoice_id)?;
    tx.commit()?;

    info!(order = order_id, invoice = invoice_id, total = created.total, "order invoiced");
    Ok(created)
}

pub fn get(db: &Database, invoice_id: i64) -> Result<InvoiceView> {
    let conn = db.lock()?;
    view(&conn, invoice_id)
}

/// Invoices visible to the viewer, newest first: all of them for an
/// administrator, their own for a customer, none for a guest.
pub fn list(db: &Database, viewer: Viewer) -> Result<Vec<InvoiceView>> {
    let conn = db.lock()?;

    let ids: Vec<i64> = match viewer {
        Viewer::Admin => {
            let mut stmt = conn.prepare("SELECT id FROM invoices ORDER BY id DESC")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        }
        Viewer::Customer(user_id) => {
            let mut stmt =
                conn.prepare("SELECT id FROM invoices WHERE customer_id = ?1 ORDER BY id DESC")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        }
        Viewer::Guest => return Ok(Vec::new()),
    };

    ids.into_iter().map(|id| view(&conn, id)).collect()
}

/// Line detail joins the product catalog as it stands today; soft-deleted
/// products still resolve here so old invoices stay renderable.
fn view(conn: &Connection, invoice_id: i64) -> Result<InvoiceView> {
    let invoice = conn
        .query_row(
            "SELECT i.id, i.customer_id, u.username, i.created_on
             FROM invoices i
             LEFT JOIN users u ON i.customer_id = u.id
             WHERE i.id = ?1",
            [invoice_id],
            |row| {
                Ok(Invoice {
                    id: row.get(0)?,
                    customer_id: row.get(1)?,
                    customer_username: row.get(2)?,
                    created_on: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(Error::NotFound {
            resource: "invoice",
            id: invoice_id,
        })?;

    let mut stmt = conn.prepare(
        "SELECT ii.product_id, c.name, p.brand, p.model, ii.quantity, p.sale_price, p.tax_rate, p.final_price
         FROM invoice_items ii
         LEFT JOIN products p ON ii.product_id = p.id
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE ii.invoice_id = ?1
         ORDER BY ii.id",
    )?;

    let lines = stmt
        .query_map([invoice_id], |row| {
            let quantity: i32 = row.get(4)?;
            let final_price: f64 = row.get(7)?;
            Ok(OrderLine {
                product_id: row.get(0)?,
                category_name: row.get(1)?,
                brand: row.get(2)?,
                model: row.get(3)?,
                quantity,
                sale_price: row.get(5)?,
                tax_rate: row.get(6)?,
                line_total: round2(final_price * quantity as f64),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let total = round2(lines.iter().map(|line| line.line_total).sum::<f64>());

    Ok(InvoiceView { invoice, lines, total })
}
