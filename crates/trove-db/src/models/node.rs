//! Stored tree node records

use super::timestamp::{from_millis, to_millis};
use crate::error::Result;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use trove_core::{AssetId, Node, NodeId, NodeType};

/// Stored node row: adjacency list, parent pointer only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 5, version = 1)]
#[native_db]
pub struct StoredNode {
    /// Primary key - node id.
    #[primary_key]
    pub id: u64,
    /// Node type tag.
    pub node_type: String,
    pub name: Option<String>,
    pub asset: Option<u64>,
    pub parent: Option<u64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StoredNode {
    /// Create from a domain node.
    pub fn from_domain(node: &Node) -> Self {
        Self {
            id: node.id.raw(),
            node_type: node.node_type.tag().to_string(),
            name: node.name.clone(),
            asset: node.asset.map(|a| a.raw()),
            parent: node.parent.map(|p| p.raw()),
            created_at: to_millis(node.created_at),
            updated_at: to_millis(node.updated_at),
        }
    }

    /// Convert to a domain node.
    pub fn to_domain(&self) -> Result<Node> {
        Ok(Node {
            id: NodeId::new(self.id),
            node_type: NodeType::from_tag(&self.node_type)?,
            name: self.name.clone(),
            asset: self.asset.map(AssetId::new),
            parent: self.parent.map(NodeId::new),
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}
