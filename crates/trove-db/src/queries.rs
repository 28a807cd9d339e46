//! Read-only query surface for the store
//!
//! These run in their own read transactions and back the external
//! API/CLI layers: lookups, tree walks and audit listings. Mutations go
//! through [`crate::WriteTxn`] instead.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use std::collections::HashSet;
use trove_core::{
    Asset, AssetCode, AssetEvent, AssetId, AssetModel, ChangeSet, ChangesetId, Manufacturer,
    ManufacturerId, ModelId, Node, NodeId,
};

impl Store {
    /// Get a manufacturer by id.
    pub fn manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredManufacturer> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// Get a manufacturer by slug.
    pub fn manufacturer_by_slug(&self, slug: &str) -> Result<Option<Manufacturer>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredManufacturer> = r
            .get()
            .secondary(StoredManufacturerKey::slug, slug.to_string())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// All manufacturers.
    pub fn manufacturers(&self) -> Result<Vec<Manufacturer>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredManufacturer>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredManufacturer>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        Ok(stored.into_iter().map(|s| s.to_domain()).collect())
    }

    /// Get a model by id.
    pub fn model(&self, id: ModelId) -> Result<Option<AssetModel>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredAssetModel> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// Get a model by slug.
    pub fn model_by_slug(&self, slug: &str) -> Result<Option<AssetModel>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredAssetModel> = r
            .get()
            .secondary(StoredAssetModelKey::slug, slug.to_string())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// All models.
    pub fn models(&self) -> Result<Vec<AssetModel>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredAssetModel>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAssetModel>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        Ok(stored.into_iter().map(|s| s.to_domain()).collect())
    }

    /// Get an asset by id.
    pub fn asset(&self, id: AssetId) -> Result<Option<Asset>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredAsset> = r.get().primary(id.raw())?;
        stored.map(|s| s.to_domain()).transpose()
    }

    /// All assets.
    pub fn assets(&self) -> Result<Vec<Asset>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredAsset>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAsset>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.into_iter().map(|s| s.to_domain()).collect()
    }

    /// Resolve an asset by any of its codes.
    ///
    /// An asset's own id string is always a usable code, so a bare
    /// number resolves directly before the code table is consulted.
    pub fn asset_by_code(&self, code: &str) -> Result<Option<Asset>> {
        if let Ok(raw) = code.parse::<u64>() {
            if let Some(asset) = self.asset(AssetId::new(raw))? {
                return Ok(Some(asset));
            }
        }
        let r = self.db.r_transaction()?;
        let stored: Option<StoredAssetCode> = r
            .get()
            .secondary(StoredAssetCodeKey::code, code.to_string())?;
        match stored {
            Some(row) => self.asset(AssetId::new(row.asset)),
            None => Ok(None),
        }
    }

    /// All codes assigned to an asset, the asset's own id first.
    pub fn asset_codes(&self, id: AssetId) -> Result<Vec<String>> {
        let mut codes = vec![id.raw().to_string()];
        codes.extend(self.codes_for_asset(id)?.into_iter().map(|c| c.code));
        Ok(codes)
    }

    /// A usable asset code for the asset: the first assigned code, or
    /// the asset's own id when none is assigned.
    pub fn first_asset_code(&self, id: AssetId) -> Result<String> {
        Ok(self
            .codes_for_asset(id)?
            .into_iter()
            .map(|c| c.code)
            .next()
            .unwrap_or_else(|| id.raw().to_string()))
    }

    /// All code rows assigned to an asset.
    pub fn codes_for_asset(&self, id: AssetId) -> Result<Vec<AssetCode>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredAssetCode>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAssetCode>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored
            .into_iter()
            .filter(|c| c.asset == id.raw())
            .map(|c| c.to_domain())
            .collect()
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Result<Option<Node>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredNode> = r.get().primary(id.raw())?;
        stored.map(|s| s.to_domain()).transpose()
    }

    /// All nodes.
    pub fn nodes(&self) -> Result<Vec<Node>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredNode>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredNode>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.into_iter().map(|s| s.to_domain()).collect()
    }

    /// The node wrapping an asset, if the asset is placed.
    pub fn node_by_asset(&self, asset: AssetId) -> Result<Option<Node>> {
        Ok(self
            .nodes()?
            .into_iter()
            .find(|n| n.asset == Some(asset)))
    }

    /// The node wrapping the asset that a code resolves to.
    pub fn node_by_code(&self, code: &str) -> Result<Option<Node>> {
        match self.asset_by_code(code)? {
            Some(asset) => self.node_by_asset(asset.id),
            None => Ok(None),
        }
    }

    /// Root nodes of the tree.
    pub fn roots(&self) -> Result<Vec<Node>> {
        Ok(self
            .nodes()?
            .into_iter()
            .filter(|n| n.parent.is_none())
            .collect())
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> Result<Vec<Node>> {
        Ok(self
            .nodes()?
            .into_iter()
            .filter(|n| n.parent == Some(id))
            .collect())
    }

    /// Ancestors of a node, nearest first.
    ///
    /// The walk is guarded against parent loops so a corrupt store
    /// cannot hang a query.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<Node>> {
        let mut seen = HashSet::from([id]);
        let mut ancestors = Vec::new();
        let mut current = self
            .node(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        while let Some(parent_id) = current.parent {
            if !seen.insert(parent_id) {
                break;
            }
            match self.node(parent_id)? {
                Some(parent) => {
                    ancestors.push(parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        Ok(ancestors)
    }

    /// All descendants of a node, in no particular order.
    ///
    /// Worklist rather than recursion; deep chains must not exhaust the
    /// stack.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<Node>> {
        let all = self.nodes()?;
        let mut result = Vec::new();
        let mut queue = vec![id];
        let mut seen = HashSet::from([id]);
        while let Some(current) = queue.pop() {
            for node in all.iter().filter(|n| n.parent == Some(current)) {
                if seen.insert(node.id) {
                    queue.push(node.id);
                    result.push(node.clone());
                }
            }
        }
        Ok(result)
    }

    /// Display name for an asset: node name, else the model name with
    /// the first code when placed, else the bare model name.
    pub fn display_name(&self, id: AssetId) -> Result<String> {
        let asset = self
            .asset(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let node = self.node_by_asset(id)?;
        if let Some(name) = node.as_ref().and_then(|n| n.name.clone()) {
            return Ok(name);
        }
        if let Some(name) = asset.name {
            return Ok(name);
        }
        let model_name = self
            .model(asset.model)?
            .map(|m| m.name)
            .ok_or_else(|| Error::NotFound(asset.model.to_string()))?;
        if node.is_some() {
            Ok(format!("{} ({})", model_name, self.first_asset_code(id)?))
        } else {
            Ok(model_name)
        }
    }

    /// Get a changeset by id.
    pub fn changeset(&self, id: ChangesetId) -> Result<Option<ChangeSet>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredChangeset> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// All changesets.
    pub fn changesets(&self) -> Result<Vec<ChangeSet>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredChangeset>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredChangeset>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        Ok(stored.into_iter().map(|s| s.to_domain()).collect())
    }

    /// All events recorded in a changeset.
    pub fn events_for_changeset(&self, id: ChangesetId) -> Result<Vec<AssetEvent>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAssetEvent>(StoredAssetEventKey::changeset)?;
        let iter = scan.start_with(id.raw())?;
        let stored: std::result::Result<Vec<StoredAssetEvent>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.into_iter().map(|e| e.to_domain()).collect()
    }

    /// All events recorded for an asset.
    pub fn events_for_asset(&self, asset: AssetId) -> Result<Vec<AssetEvent>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredAssetEvent>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAssetEvent>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored
            .into_iter()
            .filter(|e| e.asset == asset.raw())
            .map(|e| e.to_domain())
            .collect()
    }
}
