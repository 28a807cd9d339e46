//! Changesets and asset events
//!
//! A changeset groups the events of one atomic action: one user, one
//! timestamp, one comment. Events are never mutated after creation and
//! an asset appears at most once per changeset.

use crate::error::{Error, Result};
use crate::identity::{AssetId, ChangesetId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of recorded change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// First placement of an asset
    Create,
    /// A placement change, including removal from the tree
    Move,
}

impl EventType {
    /// Two-character tag persisted in the store
    pub fn tag(&self) -> &'static str {
        match self {
            EventType::Create => "CR",
            EventType::Move => "MV",
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "CR" => Ok(EventType::Create),
            "MV" => Ok(EventType::Move),
            other => Err(Error::UnknownEventType(other.to_string())),
        }
    }
}

/// A group of changes that occurred simultaneously
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub id: ChangesetId,
    /// Who made the change
    pub user: String,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// A recorded change that happened to an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEvent {
    pub id: EventId,
    pub changeset: ChangesetId,
    pub event_type: EventType,
    pub asset: AssetId,
    /// Free-form payload describing old and new placement
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        assert_eq!(EventType::from_tag("CR").unwrap(), EventType::Create);
        assert_eq!(EventType::from_tag("MV").unwrap(), EventType::Move);
        assert!(EventType::from_tag("XX").is_err());
    }
}
