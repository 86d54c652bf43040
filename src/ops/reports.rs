use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rusqlite::params;

use crate::db::Database;
use crate::error::Result;
use crate::models::{round2, MarginReport, Movement, ProductMargin, Viewer, YearlyLedger};

fn movement_from_row(row: &rusqlite::Row) -> rusqlite::Result<Movement> {
    Ok(Movement {
        id: row.get(0)?,
        model: row.get(1)?,
        customer: row.get(2)?,
        supplier: row.get(3)?,
        quantity: row.get(4)?,
        entry_date: row.get(5)?,
        amount: row.get(6)?,
        balance: Some(row.get(7)?),
    })
}

/// The last `limit` ledger movements visible to the viewer, oldest first.
/// Only the administrator view discloses the running balance.
pub fn recent_activity(db: &Database, viewer: Viewer, limit: u32) -> Result<Vec<Movement>> {
    let conn = db.lock()?;

    let mut movements = match viewer {
        Viewer::Admin => {
            let mut stmt = conn.prepare(
                "SELECT l.id, p.model, u.username, s.company, l.quantity, l.entry_date, l.amount, l.balance
                 FROM ledger l
                 LEFT JOIN products p ON l.product_id = p.id
                 LEFT JOIN users u ON l.customer_id = u.id
                 LEFT JOIN suppliers s ON l.supplier_id = s.id
                 ORDER BY l.id DESC
                 LIMIT ?1",
            )?;
            let movements = stmt
                .query_map([limit], movement_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            movements
        }
        Viewer::Customer(user_id) => {
            let mut stmt = conn.prepare(
                "SELECT l.id, p.model, u.username, s.company, l.quantity, l.entry_date, l.amount, l.balance
                 FROM ledger l
                 LEFT JOIN products p ON l.product_id = p.id
                 LEFT JOIN users u ON l.customer_id = u.id
                 LEFT JOIN suppliers s ON l.supplier_id = s.id
                 WHERE l.customer_id = ?1
                 ORDER BY l.id DESC
                 LIMIT ?2",
            )?;
            let mut movements = stmt
                .query_map(params![user_id, limit], movement_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for movement in &mut movements {
                movement.balance = None;
            }
            movements
        }
        Viewer::Guest => return Ok(Vec::new()),
    };

    movements.reverse();
    Ok(movements)
}

/// One 12-slot series per calendar year with ledger activity.
///
/// The administrator series shows the running balance as of each month's
/// last entry, carrying the prior populated month's value across gaps; the
/// customer series shows that customer's spend total per month, zero when
/// empty.
pub fn monthly_ledger(db: &Database, viewer: Viewer) -> Result<Vec<YearlyLedger>> {
    match viewer {
        Viewer::Admin => monthly_balances(db),
        Viewer::Customer(user_id) => monthly_spend(db, user_id),
        Viewer::Guest => Ok(Vec::new()),
    }
}

fn monthly_balances(db: &Database) -> Result<Vec<YearlyLedger>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare("SELECT entry_date, balance FROM ledger ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // Walking in id order leaves each slot holding the month's last balance.
    let mut last: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for (date, balance) in rows {
        let date = parse_date(&date)?;
        last.entry(date.year()).or_insert([None; 12])[date.month0() as usize] = Some(balance);
    }

    let series = last
        .into_iter()
        .map(|(year, by_month)| {
            let mut months = [0.0; 12];
            let mut carried = None;
            for (m, value) in by_month.into_iter().enumerate() {
                if value.is_some() {
                    carried = value;
                }
                months[m] = carried.unwrap_or(0.0);
            }
            YearlyLedger { year, months }
        })
        .collect();

    Ok(series)
}

fn monthly_spend(db: &Database, customer_id: i64) -> Result<Vec<YearlyLedger>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT l.entry_date, l.quantity, p.final_price
         FROM ledger l
         LEFT JOIN products p ON l.product_id = p.id
         WHERE l.customer_id = ?1
         ORDER BY l.id",
    )?;
    let rows = stmt
        .query_map([customer_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut sums: BTreeMap<i32, [f64; 12]> = BTreeMap::new();
    for (date, quantity, final_price) in rows {
        let date = parse_date(&date)?;
        sums.entry(date.year()).or_insert([0.0; 12])[date.month0() as usize] +=
            quantity as f64 * final_price;
    }

    let series = sums
        .into_iter()
        .map(|(year, mut months)| {
            for month in &mut months {
                *month = round2(*month);
            }
            YearlyLedger { year, months }
        })
        .collect();

    Ok(series)
}

/// The ten highest- and ten lowest-margin active products.
pub fn margin_extremes(db: &Database) -> Result<MarginReport> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, brand, model, purchase_price, sale_price FROM products WHERE deleted = 0",
    )?;
    let mut margins = stmt
        .query_map([], |row| {
            let purchase_price: f64 = row.get(3)?;
            let sale_price: f64 = row.get(4)?;
            Ok(ProductMargin {
                product_id: row.get(0)?,
                brand: row.get(1)?,
                model: row.get(2)?,
                purchase_price,
                sale_price,
                margin: sale_price - purchase_price,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    margins.sort_by(|a, b| b.margin.total_cmp(&a.margin));
    let highest: Vec<ProductMargin> = margins.iter().take(10).cloned().collect();
    margins.sort_by(|a, b| a.margin.total_cmp(&b.margin));
    let lowest: Vec<ProductMargin> = margins.iter().take(10).cloned().collect();

    Ok(MarginReport { highest, lowest })
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date, "%Y-%m-%d")?)
}
