//! Trove Import - Bulk import reconciler
//!
//! Ingests historical inventory datasets (directories of JSON
//! changeset files) and converges them onto the placement tree:
//! - Record and loader types for the foreign format
//! - A multi-pass reconciler: seed locations and assets, then a
//!   bounded fixed-point loop that resolves forward placement
//!   references
//!
//! Resolution failures are logged and skipped; bulk import is a
//! best-effort convergence process, not a transaction.

mod error;
mod loader;
mod reconciler;
mod records;

pub use error::{Error, Result};
pub use loader::Loader;
pub use reconciler::{Importer, ImportReport};
pub use records::{AssetRecord, ChangesetRecord, EventRecord};
