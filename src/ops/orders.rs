use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    round2, ItemRequest, Order, OrderLine, OrderView, PlacedOrder, StockAdjustment, Viewer,
};
use crate::ops::products;

/// Submits a customer cart as a pending order.
///
/// A requested quantity above the available stock is clamped to what is left
/// and reported as a non-fatal [`StockAdjustment`]; zero-quantity lines are
/// dropped. Stock moves immediately, but nothing reaches the accounting
/// ledger until the order is invoiced.
pub fn place(db: &Database, customer_id: i64, requested: &[ItemRequest]) -> Result<PlacedOrder> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let customer: Option<i64> = tx
        .query_row(
            "SELECT id FROM users WHERE id = ?1 AND deleted = 0",
            [customer_id],
            |row| row.get(0),
        )
        .optional()?;
    if customer.is_none() {
        return Err(Error::NotFound {
            resource: "customer",
            id: customer_id,
        });
    }

    // First pass settles what can actually be fulfilled; nothing is written
    // until every line has been checked.
    let mut fulfilled: Vec<(i64, i32)> = Vec::new();
    let mut adjustments: Vec<StockAdjustment> = Vec::new();
    for item in requested {
        if item.quantity < 0 {
            return Err(Error::Validation(format!(
                "negative quantity for product {}",
                item.product_id
            )));
        }
        if item.quantity == 0 {
            continue;
        }

        let product = products::active(&tx, item.product_id)?;
        let quantity = if item.quantity > product.stock {
            adjustments.push(StockAdjustment {
                product_id: product.id,
                requested: item.quantity,
                fulfilled: product.stock,
            });
            product.stock
        } else {
            item.quantity
        };
        if quantity == 0 {
            continue;
        }
        fulfilled.push((product.id, quantity));
    }

    if fulfilled.is_empty() {
        return Err(Error::EmptyOrder);
    }

    tx.execute("INSERT INTO orders (customer_id) VALUES (?1)", [customer_id])?;
    let order_id = tx.last_insert_rowid();

    for (product_id, quantity) in &fulfilled {
        tx.execute(
            "INSERT INTO order_items (order_id, product_id, quantity) VALUES (?1, ?2, ?3)",
            params![order_id, product_id, quantity],
        )?;
        tx.execute(
            "UPDATE products SET stock = stock - ?1 WHERE id = ?2",
            params![quantity, product_id],
        )?;
    }

    let order = view(&tx, order_id)?;
    tx.commit()?;

    for adj in &adjustments {
        warn!(
            product = adj.product_id,
            requested = adj.requested,
            fulfilled = adj.fulfilled,
            "order quantity clamped to available stock"
        );
    }
    info!(order = order_id, customer = customer_id, lines = order.lines.len(), "order placed");

    Ok(PlacedOrder { order, adjustments })
}

/// Puts every line's units back on the shelf, then deletes the order.
pub fn cancel(db: &Database, order_id: i64) -> Result<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let exists: Option<i64> = tx
        .query_row("SELECT id FROM orders WHERE id = ?1", [order_id], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(Error::NotFound {
            resource: "order",
            id: order_id,
        });
    }

    let items = {
        let mut stmt =
            tx.prepare("SELECT product_id, quantity FROM order_items WHERE order_id = ?1")?;
        let rows = stmt
            .query_map([order_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i32>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    for (product_id, quantity) in items {
        tx.execute(
            "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
            params![quantity, product_id],
        )?;
    }

    tx.execute("DELETE FROM order_items WHERE order_id = ?1", [order_id])?;
    tx.execute("DELETE FROM orders WHERE id = ?1", [order_id])?;

    tx.commit()?;
    info!(order = order_id, "order cancelled");
    Ok(())
}

pub fn get(db: &Database, order_id: i64) -> Result<OrderView> {
    let conn = db.lock()?;
    view(&conn, order_id)
}

/// Pending orders visible to the viewer: all of them for an administrator,
/// their own for a customer, none for a guest.
pub fn list(db: &Database, viewer: Viewer) -> Result<Vec<OrderView>> {
    let conn = db.lock()?;

    let ids: Vec<i64> = match viewer {
        Viewer::Admin => {
            let mut stmt = conn.prepare("SELECT id FROM orders ORDER BY id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        }
        Viewer::Customer(user_id) => {
            let mut stmt =
                conn.prepare("SELECT id FROM orders WHERE customer_id = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        }
        Viewer::Guest => return Ok(Vec::new()),
    };

    ids.into_iter().map(|id| view(&conn, id)).collect()
}

pub(crate) fn view(conn: &Connection, order_id: i64) -> Result<OrderView> {
    let order = conn
        .query_row(
            "SELECT o.id, o.customer_id, u.username, o.created_on
             FROM orders o
             LEFT JOIN users u ON o.customer_id = u.id
             WHERE o.id = ?1",
            [order_id],
            |row| {
                Ok(Order {
                    id: row.get(0)?,
                    customer_id: row.get(1)?,
                    customer_username: row.get(2)?,
                    created_on: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or(Error::NotFound {
            resource: "order",
            id: order_id,
        })?;

    let mut stmt = conn.prepare(
        "SELECT oi.product_id, c.name, p.brand, p.model, oi.quantity, p.sale_price, p.tax_rate, p.final_price
         FROM order_items oi
         LEFT JOIN products p ON oi.product_id = p.id
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE oi.order_id = ?1
         ORDER BY oi.id",
    )?;

    let lines = stmt
        .query_map([order_id], |row| {
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

    Ok(OrderView { order, lines, total })
}
