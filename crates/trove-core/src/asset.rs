//! Assets and asset codes

use crate::codes::CodeType;
use crate::error::{Error, Result};
use crate::identity::{AssetId, CodeId, ModelId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Free-form extension payload attached to an asset
pub type ExtraData = IndexMap<String, serde_json::Value>;

/// Lifecycle state of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssetState {
    /// A known asset that we currently hold
    #[default]
    Known,
    /// An asset whose whereabouts are unknown
    Lost,
    /// An asset that has been disposed of
    Disposed,
}

impl AssetState {
    /// Single-character tag persisted in the store
    pub fn tag(&self) -> &'static str {
        match self {
            AssetState::Known => "K",
            AssetState::Lost => "L",
            AssetState::Disposed => "D",
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "K" => Ok(AssetState::Known),
            "L" => Ok(AssetState::Lost),
            "D" => Ok(AssetState::Disposed),
            other => Err(Error::UnknownAssetState(other.to_string())),
        }
    }

    /// Disposal is final; disposed assets never re-enter the tree
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetState::Disposed)
    }
}

/// A physical, individually tracked item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier for this asset
    pub id: AssetId,
    /// Optional explicit name; display falls back to the model
    pub name: Option<String>,
    /// The model this asset is an instance of
    pub model: ModelId,
    /// Lifecycle state, correlated with tree placement
    pub state: AssetState,
    /// Untyped extension payload
    pub extra: ExtraData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Create a new asset in the default state
    pub fn new(id: AssetId, model: ModelId) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            model,
            state: AssetState::default(),
            extra: ExtraData::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// An individual code demarking an asset.
///
/// Codes are immutable once created and die with their asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCode {
    /// Unique identifier for this code row
    pub id: CodeId,
    /// The globally unique code string
    pub code: String,
    /// Which format the code follows
    pub code_type: CodeType,
    /// The asset this code demarks
    pub asset: AssetId,
}
