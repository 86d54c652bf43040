use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewUser, Role, User};

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        first_name: row.get(5)?,
        last_name: row.get(6)?,
        address: row.get(7)?,
        city: row.get(8)?,
        province: row.get(9)?,
        role: Role::from_code(row.get(10)?),
        joined_on: row.get(11)?,
        deleted: row.get::<_, i64>(12)? != 0,
    })
}

/// Registers a customer account. The password hash is produced by the
/// external authentication collaborator; this store only persists it.
pub fn register(db: &Database, user: NewUser) -> Result<User> {
    let conn = db.lock()?;

    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1 AND deleted = 0",
            [&user.email],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(Error::AlreadyExists {
            resource: "user",
            name: user.email,
        });
    }

    conn.execute(
        "INSERT INTO users (username, phone, email, password_hash, first_name, last_name, address, city, province, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user.username,
            user.phone,
            user.email,
            user.password_hash,
            user.first_name,
            user.last_name,
            user.address,
            user.city,
            user.province,
            Role::Customer.code(),
        ],
    )?;

    let id = conn.last_insert_rowid();
    get(&conn, id)
}

/// Lookup hook for the external login flow: active users only.
pub fn find_active_by_email(db: &Database, email: &str) -> Result<Option<User>> {
    let conn = db.lock()?;

    let user = conn
        .query_row(
            "SELECT id, username, phone, email, password_hash, first_name, last_name, address, city, province, role, joined_on, deleted
             FROM users
             WHERE email = ?1 AND deleted = 0",
            [email],
            user_from_row,
        )
        .optional()?;

    Ok(user)
}

pub fn list(db: &Database) -> Result<Vec<User>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(
        "SELECT id, username, phone, email, password_hash, first_name, last_name, address, city, province, role, joined_on, deleted
         FROM users
         WHERE deleted = 0
         ORDER BY username",
    )?;

    let users = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(users)
}

pub fn soft_delete(db: &Database, id: i64) -> Result<()> {
    let conn = db.lock()?;

    let changed = conn.execute(
        "UPDATE users SET deleted = 1 WHERE id = ?1 AND deleted = 0",
        [id],
    )?;
    if changed == 0 {
        return Err(Error::NotFound {
            resource: "user",
            id,
        });
    }

    Ok(())
}

fn get(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, username, phone, email, password_hash, first_name, last_name, address, city, province, role, joined_on, deleted
         FROM users
         WHERE id = ?1",
        [id],
        user_from_row,
    )
    .optional()?
    .ok_or(Error::NotFound {
        resource: "user",
        id,
    })
}
