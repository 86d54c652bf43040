use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },
    #[error("order contains no items with a positive quantity")]
    EmptyOrder,
    #[error("{resource} '{name}' already exists")]
    AlreadyExists {
        resource: &'static str,
        name: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid date in store: {0}")]
    Date(#[from] chrono::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
