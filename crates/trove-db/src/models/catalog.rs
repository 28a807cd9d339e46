//! Stored manufacturer and asset model records

use super::timestamp::{from_millis, to_millis};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use trove_core::{AssetModel, Manufacturer, ManufacturerId, ModelId};

/// Stored manufacturer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredManufacturer {
    /// Primary key - manufacturer id.
    #[primary_key]
    pub id: u64,
    /// Unique URL-safe identifier.
    #[secondary_key(unique)]
    pub slug: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredManufacturer {
    /// Create from a domain manufacturer.
    pub fn from_domain(m: &Manufacturer) -> Self {
        Self {
            id: m.id.raw(),
            slug: m.slug.clone(),
            name: m.name.clone(),
            created_at: to_millis(m.created_at),
            updated_at: to_millis(m.updated_at),
        }
    }

    /// Convert to a domain manufacturer.
    pub fn to_domain(&self) -> Manufacturer {
        Manufacturer {
            id: ManufacturerId::new(self.id),
            name: self.name.clone(),
            slug: self.slug.clone(),
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        }
    }
}

/// Stored asset model row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredAssetModel {
    /// Primary key - model id.
    #[primary_key]
    pub id: u64,
    /// Unique URL-safe identifier.
    #[secondary_key(unique)]
    pub slug: String,
    pub name: String,
    /// Whether instances can contain other nodes.
    pub is_container: bool,
    pub manufacturer: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredAssetModel {
    /// Create from a domain model.
    pub fn from_domain(m: &AssetModel) -> Self {
        Self {
            id: m.id.raw(),
            slug: m.slug.clone(),
            name: m.name.clone(),
            is_container: m.is_container,
            manufacturer: m.manufacturer.raw(),
            created_at: to_millis(m.created_at),
            updated_at: to_millis(m.updated_at),
        }
    }

    /// Convert to a domain model.
    pub fn to_domain(&self) -> AssetModel {
        AssetModel {
            id: ModelId::new(self.id),
            name: self.name.clone(),
            slug: self.slug.clone(),
            is_container: self.is_container,
            manufacturer: ManufacturerId::new(self.manufacturer),
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        }
    }
}
