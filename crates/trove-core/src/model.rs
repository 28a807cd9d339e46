//! Manufacturers and asset models

use crate::identity::{ManufacturerId, ModelId};
use crate::slug::slugify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity that manufactures goods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: ManufacturerId,
    pub name: String,
    /// URL-safe identifier derived from the name, unique in the store
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manufacturer {
    /// Create a manufacturer, deriving the slug from the name
    pub fn new(id: ManufacturerId, name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            slug: slugify(&name),
            id,
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The model of an asset: a class of interchangeable items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetModel {
    pub id: ModelId,
    pub name: String,
    /// URL-safe identifier derived from the name, unique in the store
    pub slug: String,
    /// Whether instances of this model can contain other nodes
    pub is_container: bool,
    pub manufacturer: ManufacturerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssetModel {
    /// Create a model, deriving the slug from the name
    pub fn new(id: ModelId, name: impl Into<String>, manufacturer: ManufacturerId) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            slug: slugify(&name),
            id,
            name,
            is_container: false,
            manufacturer,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style container flag
    pub fn container(mut self, is_container: bool) -> Self {
        self.is_container = is_container;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manufacturer_slug() {
        let m = Manufacturer::new(ManufacturerId::new(1), "Acme Corp");
        assert_eq!(m.slug, "acme-corp");
    }

    #[test]
    fn test_model_defaults() {
        let model = AssetModel::new(ModelId::new(1), "Medium Widget", ManufacturerId::new(1));
        assert_eq!(model.slug, "medium-widget");
        assert!(!model.is_container);
        assert!(model.container(true).is_container);
    }
}
