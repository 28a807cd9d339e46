//! Persisted id sequences

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// One id sequence per entity kind, bumped inside the allocating
/// transaction so ids stay dense and never collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 8, version = 1)]
#[native_db]
pub struct StoredSequence {
    /// Primary key - sequence name.
    #[primary_key]
    pub key: String,
    /// Next id to hand out.
    pub next: u64,
}
