//! Trove DB - Database layer using native_db
//!
//! Provides persistent storage for:
//! - Manufacturers, asset models and assets
//! - Asset codes with store-level uniqueness
//! - The placement tree (adjacency list)
//! - Changesets and asset events
//!
//! Mutations run through [`WriteTxn`] so one operation commits
//! atomically; reads go through the query surface on [`Store`].

mod error;
mod models;
mod queries;
mod store;

pub use error::{Error, Result};
pub use store::{Store, WriteTxn};
