//! Storage, bookkeeping and reporting core for a small multi-tenant
//! inventory and billing shop.
//!
//! The crate keeps stock counts, the order/invoice lifecycle and the
//! append-only accounting ledger mutually consistent, and computes the
//! per-role summaries the presentation layer renders. Routing, templates,
//! sessions, password hashing and chart images all live outside.

pub mod db;
pub mod error;
pub mod models;
pub mod ops;


pub use db::Database;
pub use error::{Error, Result};
