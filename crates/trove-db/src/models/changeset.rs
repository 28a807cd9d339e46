//! Stored changeset and asset event records

use super::timestamp::{from_millis, to_millis};
use crate::error::Result;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use trove_core::{AssetEvent, AssetId, ChangeSet, ChangesetId, EventId, EventType};

/// Stored changeset row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct StoredChangeset {
    /// Primary key - changeset id.
    #[primary_key]
    pub id: u64,
    pub user: String,
    pub comment: String,
    pub timestamp: i64,
}

impl StoredChangeset {
    /// Create from a domain changeset.
    pub fn from_domain(cs: &ChangeSet) -> Self {
        Self {
            id: cs.id.raw(),
            user: cs.user.clone(),
            comment: cs.comment.clone(),
            timestamp: to_millis(cs.timestamp),
        }
    }

    /// Convert to a domain changeset.
    pub fn to_domain(&self) -> ChangeSet {
        ChangeSet {
            id: ChangesetId::new(self.id),
            user: self.user.clone(),
            comment: self.comment.clone(),
            timestamp: from_millis(self.timestamp),
        }
    }
}

/// Stored asset event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 7, version = 1)]
#[native_db]
pub struct StoredAssetEvent {
    /// Primary key - event id.
    #[primary_key]
    pub id: u64,
    /// Owning changeset.
    #[secondary_key]
    pub changeset: u64,
    /// Event type tag.
    pub event_type: String,
    pub asset: u64,
    /// Placement payload as JSON text.
    pub data: String,
}

impl StoredAssetEvent {
    /// Create from a domain event.
    pub fn from_domain(event: &AssetEvent) -> Self {
        Self {
            id: event.id.raw(),
            changeset: event.changeset.raw(),
            event_type: event.event_type.tag().to_string(),
            asset: event.asset.raw(),
            data: serde_json::to_string(&event.data).unwrap_or_default(),
        }
    }

    /// Convert to a domain event.
    pub fn to_domain(&self) -> Result<AssetEvent> {
        Ok(AssetEvent {
            id: EventId::new(self.id),
            changeset: ChangesetId::new(self.changeset),
            event_type: EventType::from_tag(&self.event_type)?,
            asset: AssetId::new(self.asset),
            data: serde_json::from_str(&self.data).unwrap_or(serde_json::Value::Null),
        })
    }
}
