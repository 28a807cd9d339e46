//! Stored asset and asset code records

use super::timestamp::{from_millis, to_millis};
use crate::error::Result;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use trove_core::{Asset, AssetCode, AssetId, AssetState, CodeId, CodeType, ExtraData, ModelId};

/// Stored asset row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredAsset {
    /// Primary key - asset id.
    #[primary_key]
    pub id: u64,
    pub name: Option<String>,
    pub model: u64,
    /// Lifecycle state tag.
    pub state: String,
    /// Extension payload as JSON text; the store codec is not
    /// self-describing, so untyped values stay in JSON.
    pub extra: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredAsset {
    /// Create from a domain asset.
    pub fn from_domain(asset: &Asset) -> Self {
        Self {
            id: asset.id.raw(),
            name: asset.name.clone(),
            model: asset.model.raw(),
            state: asset.state.tag().to_string(),
            extra: serde_json::to_string(&asset.extra).unwrap_or_default(),
            created_at: to_millis(asset.created_at),
            updated_at: to_millis(asset.updated_at),
        }
    }

    /// Convert to a domain asset.
    pub fn to_domain(&self) -> Result<Asset> {
        let extra: ExtraData = serde_json::from_str(&self.extra).unwrap_or_default();
        Ok(Asset {
            id: AssetId::new(self.id),
            name: self.name.clone(),
            model: ModelId::new(self.model),
            state: AssetState::from_tag(&self.state)?,
            extra,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

/// Stored asset code row.
///
/// The `code` column carries the global uniqueness guarantee: inserting
/// a second row with the same code fails with a duplicate key error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct StoredAssetCode {
    /// Primary key - code row id.
    #[primary_key]
    pub id: u64,
    /// The unique code string.
    #[secondary_key(unique)]
    pub code: String,
    /// Code format tag.
    pub code_type: String,
    pub asset: u64,
}

impl StoredAssetCode {
    /// Create from a domain code.
    pub fn from_domain(code: &AssetCode) -> Self {
        Self {
            id: code.id.raw(),
            code: code.code.clone(),
            code_type: code.code_type.tag().to_string(),
            asset: code.asset.raw(),
        }
    }

    /// Convert to a domain code.
    pub fn to_domain(&self) -> Result<AssetCode> {
        Ok(AssetCode {
            id: CodeId::new(self.id),
            code: self.code.clone(),
            code_type: CodeType::from_tag(&self.code_type)?,
            asset: AssetId::new(self.asset),
        })
    }
}
