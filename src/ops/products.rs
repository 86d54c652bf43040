use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{final_price, LedgerEntry, NewProduct, Product, UpdateProduct};
use crate::ops::ledger;

pub(crate) fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        category_id: row.get(1)?,
        category_name: row.get(2)?,
        brand: row.get(3)?,
        model: row.get(4)?,
        description: row.get(5)?,
        supplier_id: row.get(6)?,
        purchase_price: row.get(7)?,
        sale_price: row.get(8)?,
        tax_rate: row.get(9)?,
        max_quantity: row.get(10)?,
        stock: row.get(11)?,
        final_price: row.get(12)?,
        deleted: row.get::<_, i64>(13)? != 0,
    })
}

pub fn list(db: &Database) -> Result<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.category_id, c.name, p.brand, p.model, p.description, p.supplier_id, p.purchase_price, p.sale_price, p.tax_rate, p.max_quantity, p.stock, p.final_price, p.deleted
         FROM products p
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE p.deleted = 0
         ORDER BY c.name, p.model",
    )?;

    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products)
}

pub fn list_by_category(db: &Database, category_id: i64) -> Result<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.category_id, c.name, p.brand, p.model, p.description, p.supplier_id, p.purchase_price, p.sale_price, p.tax_rate, p.max_quantity, p.stock, p.final_price, p.deleted
         FROM products p
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE p.category_id = ?1 AND p.deleted = 0
         ORDER BY p.model",
    )?;

    let products = stmt
        .query_map([category_id], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products)
}

/// Products whose stock has fallen below 90% of their shelf maximum; the
/// landing page shows these as a restock alert.
pub fn understocked(db: &Database) -> Result<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.category_id, c.name, p.brand, p.model, p.description, p.supplier_id, p.purchase_price, p.sale_price, p.tax_rate, p.max_quantity, p.stock, p.final_price, p.deleted
         FROM products p
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE p.deleted = 0 AND p.stock < p.max_quantity * 0.9
         ORDER BY p.stock",
    )?;

    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products)
}

pub fn get(db: &Database, id: i64) -> Result<Product> {
    let conn = db.lock()?;
    fetch(&conn, id)
}

/// Creates the product and books its initial stock as a purchase from the
/// supplier, in one transaction.
pub fn create(db: &Database, product: NewProduct) -> Result<Product> {
    if product.stock < 0 {
        return Err(Error::Validation("stock cannot be negative".into()));
    }

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    require_category(&tx, product.category_id)?;
    require_supplier(&tx, product.supplier_id)?;

    let price = final_price(product.sale_price, product.tax_rate);
    tx.execute(
        "INSERT INTO products (category_id, brand, model, description, supplier_id, purchase_price, sale_price, tax_rate, max_quantity, stock, final_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            product.category_id,
            product.brand,
            product.model,
            product.description,
            product.supplier_id,
            product.purchase_price,
            product.sale_price,
            product.tax_rate,
            product.max_quantity,
            product.stock,
            price,
        ],
    )?;
    let id = tx.last_insert_rowid();

    ledger::append(
        &tx,
        id,
        None,
        product.supplier_id,
        product.stock,
        -(product.purchase_price * product.stock as f64),
    )?;

    let created = fetch(&tx, id)?;
    tx.commit()?;

    debug!(product = id, stock = product.stock, "product created");
    Ok(created)
}

/// Full field edit. The tax-inclusive price is recomputed, and a grown
/// stock count is booked as a restock purchase at the new purchase price.
pub fn update(db: &Database, product: UpdateProduct) -> Result<Product> {
    if product.stock < 0 {
        return Err(Error::Validation("stock cannot be negative".into()));
    }

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let existing = active(&tx, product.id)?;
    require_category(&tx, product.category_id)?;
    require_supplier(&tx, product.supplier_id)?;

    let price = final_price(product.sale_price, product.tax_rate);
    tx.execute(
        "UPDATE products
         SET category_id = ?1, brand = ?2, model = ?3, description = ?4, supplier_id = ?5, purchase_price = ?6, sale_price = ?7, tax_rate = ?8, max_quantity = ?9, stock = ?10, final_price = ?11
         WHERE id = ?12",
        params![
            product.category_id,
            product.brand,
            product.model,
            product.description,
            product.supplier_id,
            product.purchase_price,
            product.sale_price,
            product.tax_rate,
            product.max_quantity,
            product.stock,
            price,
            product.id,
        ],
    )?;

    book_restock(
        &tx,
        product.id,
        product.supplier_id,
        existing.stock,
        product.stock,
        product.purchase_price,
    )?;

    let updated = fetch(&tx, product.id)?;
    tx.commit()?;

    Ok(updated)
}

/// Takes delivery of `quantity` units from the product's supplier and books
/// the cost in the ledger.
pub fn receive_stock(
    db: &Database,
    product_id: i64,
    quantity: i32,
    unit_cost: f64,
) -> Result<LedgerEntry> {
    if quantity <= 0 {
        return Err(Error::Validation("received quantity must be positive".into()));
    }

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let product = active(&tx, product_id)?;
    require_supplier(&tx, product.supplier_id)?;

    tx.execute(
        "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
        params![quantity, product_id],
    )?;
    let entry = ledger::append(
        &tx,
        product_id,
        None,
        product.supplier_id,
        quantity,
        -(unit_cost * quantity as f64),
    )?;

    tx.commit()?;
    debug!(product = product_id, quantity, "stock received");
    Ok(entry)
}

/// Sets the stock count directly. A grown count is booked like a purchase
/// of the delta; a shrunk or unchanged count only updates the row.
pub fn edit_stock(db: &Database, product_id: i64, new_stock: i32) -> Result<Product> {
    if new_stock < 0 {
        return Err(Error::Validation("stock cannot be negative".into()));
    }

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let product = active(&tx, product_id)?;
    tx.execute(
        "UPDATE products SET stock = ?1 WHERE id = ?2",
        params![new_stock, product_id],
    )?;
    book_restock(
        &tx,
        product_id,
        product.supplier_id,
        product.stock,
        new_stock,
        product.purchase_price,
    )?;

    let updated = fetch(&tx, product_id)?;
    tx.commit()?;

    debug!(product = product_id, stock = new_stock, "stock edited");
    Ok(updated)
}

/// Soft-deletes the product and rewrites pending orders: lines referencing
/// it are removed and an order left empty is dropped outright. Stock is not
/// restored for the removed lines.
pub fn soft_delete(db: &Database, id: i64) -> Result<()> {
    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    let changed = tx.execute(
        "UPDATE products SET deleted = 1 WHERE id = ?1 AND deleted = 0",
        [id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound {
            resource: "product",
            id,
        });
    }

    tx.execute("DELETE FROM order_items WHERE product_id = ?1", [id])?;
    let emptied = tx.execute(
        "DELETE FROM orders WHERE id NOT IN (SELECT DISTINCT order_id FROM order_items)",
        [],
    )?;

    tx.commit()?;
    if emptied > 0 {
        info!(product = id, orders = emptied, "dropped orders emptied by product deletion");
    }
    Ok(())
}

pub(crate) fn fetch(conn: &Connection, id: i64) -> Result<Product> {
    conn.query_row(
        "SELECT p.id, p.category_id, c.name, p.brand, p.model, p.description, p.supplier_id, p.purchase_price, p.sale_price, p.tax_rate, p.max_quantity, p.stock, p.final_price, p.deleted
         FROM products p
         LEFT JOIN categories c ON p.category_id = c.id
         WHERE p.id = ?1",
        [id],
        product_from_row,
    )
    .optional()?
    .ok_or(Error::NotFound {
        resource: "product",
        id,
    })
}

/// A soft-deleted product counts as missing for new bookings.
pub(crate) fn active(conn: &Connection, id: i64) -> Result<Product> {
    let product = fetch(conn, id)?;
    if product.deleted {
        return Err(Error::NotFound {
            resource: "product",
            id,
        });
    }
    Ok(product)
}

fn book_restock(
    conn: &Connection,
    product_id: i64,
    supplier_id: i64,
    old_stock: i32,
    new_stock: i32,
    purchase_price: f64,
) -> Result<()> {
    let delta = new_stock - old_stock;
    if delta > 0 {
        ledger::append(
            conn,
            product_id,
            None,
            supplier_id,
            delta,
            -(purchase_price * delta as f64),
        )?;
    }
    Ok(())
}

fn require_category(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE id = ?1 AND deleted = 0",
            [id],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(Error::NotFound {
            resource: "category",
            id,
        });
    }
    Ok(())
}

fn require_supplier(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM suppliers WHERE id = ?1 AND deleted = 0",
            [id],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(Error::NotFound {
            resource: "supplier",
            id,
        });
    }
    Ok(())
}
