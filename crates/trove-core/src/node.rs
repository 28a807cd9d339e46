//! Nodes of the placement tree
//!
//! The tree is an adjacency list: a node holds only its parent id, so
//! ancestor and cycle checks are reachability walks rather than pointer
//! chasing. A node either wraps an asset or is a named location.

use crate::error::{Error, Result};
use crate::identity::{AssetId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Wraps exactly one asset
    Asset,
    /// A named organisational unit with no linked asset
    Location,
}

impl NodeType {
    /// Single-character tag persisted in the store
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Asset => "A",
            NodeType::Location => "L",
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "A" => Ok(NodeType::Asset),
            "L" => Ok(NodeType::Location),
            other => Err(Error::UnknownNodeType(other.to_string())),
        }
    }
}

/// A node in the asset tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Display name; required for locations, optional for assets
    pub name: Option<String>,
    /// Linked asset; present exactly when `node_type` is `Asset`
    pub asset: Option<AssetId>,
    /// Parent node; `None` for roots
    pub parent: Option<NodeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a location node
    pub fn location(id: NodeId, name: impl Into<String>, parent: Option<NodeId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            node_type: NodeType::Location,
            name: Some(name.into()),
            asset: None,
            parent,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an asset node
    pub fn asset(id: NodeId, asset: AssetId, name: Option<String>, parent: Option<NodeId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            node_type: NodeType::Asset,
            name,
            asset: Some(asset),
            parent,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this node is a root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check the shape invariants: an asset node always links an asset,
    /// a location node never does and always has a name.
    pub fn check_shape(&self) -> std::result::Result<(), String> {
        match self.node_type {
            NodeType::Asset => {
                if self.asset.is_none() {
                    return Err("Asset nodes must have an associated asset".to_string());
                }
            }
            NodeType::Location => {
                if self.asset.is_some() {
                    return Err("Location nodes cannot have an associated asset".to_string());
                }
                if self.name.as_deref().unwrap_or("").is_empty() {
                    return Err("Location nodes must have a name".to_string());
                }
            }
        }
        Ok(())
    }

    /// Bump the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
