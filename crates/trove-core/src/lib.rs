//! Trove Core - Domain types and asset code validation
//!
//! This crate provides the store-independent heart of the inventory:
//! - Typed identifiers for every entity
//! - The Damm base-32 check digit engine
//! - Asset code strategies (arbitrary, checksummed, legacy) and their
//!   prefix configuration
//! - Domain entities: manufacturers, models, assets, codes, tree nodes,
//!   changesets and events
//! - A deterministic RNG for reproducible code generation

pub mod damm32;

mod asset;
mod changeset;
mod codes;
mod error;
mod identity;
mod model;
mod node;
mod rng;
mod slug;

pub use asset::{Asset, AssetCode, AssetState, ExtraData};
pub use changeset::{AssetEvent, ChangeSet, EventType};
pub use codes::{
    ArbitraryStrategy, ChecksummedStrategy, CodeConfig, CodeRegistry, CodeStrategy, CodeType,
    LegacyStrategy,
};
pub use damm32::Damm32;
pub use error::{Error, Result};
pub use identity::{AssetId, ChangesetId, CodeId, EventId, ManufacturerId, ModelId, NodeId};
pub use model::{AssetModel, Manufacturer};
pub use node::{Node, NodeType};
pub use rng::CodeRng;
pub use slug::slugify;
