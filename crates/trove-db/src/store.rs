//! Database store wrapper
//!
//! [`Store`] owns the database; [`WriteTxn`] wraps one read-write
//! transaction so that a whole engine operation commits atomically or
//! not at all. Reads issued through a `WriteTxn` observe its own
//! uncommitted writes, which the tree engine relies on for its
//! invariant checks.

use crate::error::{Error, Result};
use crate::models::*;
use native_db::transaction::RwTransaction;
use native_db::*;
use std::path::Path;
use std::sync::LazyLock;
use trove_core::{
    Asset, AssetCode, AssetEvent, AssetId, AssetModel, ChangeSet, ChangesetId, Manufacturer,
    ManufacturerId, ModelId, Node, NodeId,
};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredManufacturer>().unwrap();
    models.define::<StoredAssetModel>().unwrap();
    models.define::<StoredAsset>().unwrap();
    models.define::<StoredAssetCode>().unwrap();
    models.define::<StoredNode>().unwrap();
    models.define::<StoredChangeset>().unwrap();
    models.define::<StoredAssetEvent>().unwrap();
    models.define::<StoredSequence>().unwrap();
    models
});

/// Sequence names used for id allocation.
pub(crate) mod seq {
    pub const MANUFACTURER: &str = "manufacturer";
    pub const MODEL: &str = "model";
    pub const ASSET: &str = "asset";
    pub const CODE: &str = "code";
    pub const NODE: &str = "node";
    pub const CHANGESET: &str = "changeset";
    pub const EVENT: &str = "event";
}

/// Database store for the inventory.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Begin a read-write transaction.
    pub fn begin_write(&self) -> Result<WriteTxn<'_>> {
        Ok(WriteTxn {
            rw: self.db.rw_transaction()?,
        })
    }
}

/// One atomic read-write transaction over the store.
pub struct WriteTxn<'db> {
    rw: RwTransaction<'db>,
}

impl WriteTxn<'_> {
    /// Commit the transaction.
    pub fn commit(self) -> Result<()> {
        self.rw.commit()?;
        Ok(())
    }

    /// Allocate the next id from a named sequence.
    fn next_id(&self, key: &str) -> Result<u64> {
        let current: Option<StoredSequence> = self.rw.get().primary(key.to_string())?;
        let next = current.as_ref().map(|s| s.next).unwrap_or(1);
        self.rw.upsert(StoredSequence {
            key: key.to_string(),
            next: next + 1,
        })?;
        Ok(next)
    }

    /// Allocate a manufacturer id.
    pub fn next_manufacturer_id(&self) -> Result<ManufacturerId> {
        Ok(ManufacturerId::new(self.next_id(seq::MANUFACTURER)?))
    }

    /// Allocate a model id.
    pub fn next_model_id(&self) -> Result<ModelId> {
        Ok(ModelId::new(self.next_id(seq::MODEL)?))
    }

    /// Allocate an asset id.
    pub fn next_asset_id(&self) -> Result<AssetId> {
        Ok(AssetId::new(self.next_id(seq::ASSET)?))
    }

    /// Allocate a code row id.
    pub fn next_code_id(&self) -> Result<trove_core::CodeId> {
        Ok(trove_core::CodeId::new(self.next_id(seq::CODE)?))
    }

    /// Allocate a node id.
    pub fn next_node_id(&self) -> Result<NodeId> {
        Ok(NodeId::new(self.next_id(seq::NODE)?))
    }

    /// Allocate a changeset id.
    pub fn next_changeset_id(&self) -> Result<ChangesetId> {
        Ok(ChangesetId::new(self.next_id(seq::CHANGESET)?))
    }

    /// Allocate an event id.
    pub fn next_event_id(&self) -> Result<trove_core::EventId> {
        Ok(trove_core::EventId::new(self.next_id(seq::EVENT)?))
    }

    // Manufacturers

    /// Insert a manufacturer; fails on a duplicate slug.
    pub fn insert_manufacturer(&self, m: &Manufacturer) -> Result<()> {
        self.rw.insert(StoredManufacturer::from_domain(m))?;
        Ok(())
    }

    /// Get a manufacturer by id.
    pub fn manufacturer(&self, id: ManufacturerId) -> Result<Option<Manufacturer>> {
        let stored: Option<StoredManufacturer> = self.rw.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// Get a manufacturer by slug.
    pub fn manufacturer_by_slug(&self, slug: &str) -> Result<Option<Manufacturer>> {
        let stored: Option<StoredManufacturer> = self
            .rw
            .get()
            .secondary(StoredManufacturerKey::slug, slug.to_string())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    // Asset models

    /// Insert a model; fails on a duplicate slug.
    pub fn insert_model(&self, m: &AssetModel) -> Result<()> {
        self.rw.insert(StoredAssetModel::from_domain(m))?;
        Ok(())
    }

    /// Update a model in place.
    pub fn update_model(&self, m: &AssetModel) -> Result<()> {
        self.rw.upsert(StoredAssetModel::from_domain(m))?;
        Ok(())
    }

    /// Get a model by id.
    pub fn model(&self, id: ModelId) -> Result<Option<AssetModel>> {
        let stored: Option<StoredAssetModel> = self.rw.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    /// Get a model by slug.
    pub fn model_by_slug(&self, slug: &str) -> Result<Option<AssetModel>> {
        let stored: Option<StoredAssetModel> = self
            .rw
            .get()
            .secondary(StoredAssetModelKey::slug, slug.to_string())?;
        Ok(stored.map(|s| s.to_domain()))
    }

    // Assets

    /// Insert an asset.
    pub fn insert_asset(&self, asset: &Asset) -> Result<()> {
        self.rw.insert(StoredAsset::from_domain(asset))?;
        Ok(())
    }

    /// Update an asset in place.
    pub fn update_asset(&self, asset: &Asset) -> Result<()> {
        self.rw.upsert(StoredAsset::from_domain(asset))?;
        Ok(())
    }

    /// Get an asset by id.
    pub fn asset(&self, id: AssetId) -> Result<Option<Asset>> {
        let stored: Option<StoredAsset> = self.rw.get().primary(id.raw())?;
        stored.map(|s| s.to_domain()).transpose()
    }

    /// Delete an asset and cascade onto its codes.
    ///
    /// The caller is responsible for having removed the asset's node
    /// first; the tree engine enforces that ordering.
    pub fn delete_asset(&self, id: AssetId) -> Result<()> {
        for code in self.codes_for_asset(id)? {
            let stored: Option<StoredAssetCode> = self.rw.get().primary(code.id.raw())?;
            if let Some(s) = stored {
                self.rw.remove(s)?;
            }
        }
        let stored: Option<StoredAsset> = self.rw.get().primary(id.raw())?;
        if let Some(s) = stored {
            self.rw.remove(s)?;
        }
        Ok(())
    }

    // Asset codes

    /// Insert a code; a uniqueness violation surfaces as
    /// [`Error::DuplicateKey`].
    pub fn insert_code(&self, code: &AssetCode) -> Result<()> {
        self.rw.insert(StoredAssetCode::from_domain(code))?;
        Ok(())
    }

    /// Look up a code row by its code string.
    pub fn code(&self, code: &str) -> Result<Option<AssetCode>> {
        let stored: Option<StoredAssetCode> = self
            .rw
            .get()
            .secondary(StoredAssetCodeKey::code, code.to_string())?;
        stored.map(|s| s.to_domain()).transpose()
    }

    /// All codes assigned to an asset.
    pub fn codes_for_asset(&self, asset: AssetId) -> Result<Vec<AssetCode>> {
        let scan = self.rw.scan().primary::<StoredAssetCode>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAssetCode>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored
            .into_iter()
            .filter(|c| c.asset == asset.raw())
            .map(|c| c.to_domain())
            .collect()
    }

    // Nodes

    /// Insert a node.
    pub fn insert_node(&self, node: &Node) -> Result<()> {
        self.rw.insert(StoredNode::from_domain(node))?;
        Ok(())
    }

    /// Update a node in place.
    pub fn update_node(&self, node: &Node) -> Result<()> {
        self.rw.upsert(StoredNode::from_domain(node))?;
        Ok(())
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Result<Option<Node>> {
        let stored: Option<StoredNode> = self.rw.get().primary(id.raw())?;
        stored.map(|s| s.to_domain()).transpose()
    }

    /// Get the node wrapping an asset, if the asset is placed.
    pub fn node_by_asset(&self, asset: AssetId) -> Result<Option<Node>> {
        for node in self.all_nodes()? {
            if node.asset == Some(asset) {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Direct children of a node.
    pub fn children(&self, id: NodeId) -> Result<Vec<Node>> {
        Ok(self
            .all_nodes()?
            .into_iter()
            .filter(|n| n.parent == Some(id))
            .collect())
    }

    /// Number of direct children of a node.
    pub fn child_count(&self, id: NodeId) -> Result<usize> {
        Ok(self.children(id)?.len())
    }

    /// All nodes in the tree.
    pub fn all_nodes(&self) -> Result<Vec<Node>> {
        let scan = self.rw.scan().primary::<StoredNode>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredNode>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.into_iter().map(|n| n.to_domain()).collect()
    }

    /// Delete a node row.
    pub fn delete_node(&self, id: NodeId) -> Result<()> {
        let stored: Option<StoredNode> = self.rw.get().primary(id.raw())?;
        if let Some(s) = stored {
            self.rw.remove(s)?;
        }
        Ok(())
    }

    // Changesets and events

    /// Insert a changeset.
    pub fn insert_changeset(&self, cs: &ChangeSet) -> Result<()> {
        self.rw.insert(StoredChangeset::from_domain(cs))?;
        Ok(())
    }

    /// Find a changeset with the same user, comment and timestamp, the
    /// grouping key used when replaying grouped history.
    pub fn find_changeset(&self, cs: &ChangeSet) -> Result<Option<ChangeSet>> {
        let scan = self.rw.scan().primary::<StoredChangeset>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredChangeset>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        Ok(stored
            .into_iter()
            .find(|s| {
                s.user == cs.user
                    && s.comment == cs.comment
                    && s.timestamp == cs.timestamp.timestamp_millis()
            })
            .map(|s| s.to_domain()))
    }

    /// Insert an event.
    pub fn insert_event(&self, event: &AssetEvent) -> Result<()> {
        self.rw.insert(StoredAssetEvent::from_domain(event))?;
        Ok(())
    }

    /// All events recorded in a changeset.
    pub fn events_for_changeset(&self, id: ChangesetId) -> Result<Vec<AssetEvent>> {
        let scan = self
            .rw
            .scan()
            .secondary::<StoredAssetEvent>(StoredAssetEventKey::changeset)?;
        let iter = scan.start_with(id.raw())?;
        let stored: std::result::Result<Vec<StoredAssetEvent>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.into_iter().map(|e| e.to_domain()).collect()
    }

    /// All events recorded for an asset.
    pub fn events_for_asset(&self, asset: AssetId) -> Result<Vec<AssetEvent>> {
        let scan = self.rw.scan().primary::<StoredAssetEvent>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredAssetEvent>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored
            .into_iter()
            .filter(|e| e.asset == asset.raw())
            .map(|e| e.to_domain())
            .collect()
    }

    /// Delete every event recorded for an asset, the cascade taken when
    /// the asset itself is deleted.
    pub fn delete_events_for_asset(&self, asset: AssetId) -> Result<()> {
        // Close the scan before removing so the table is only open once.
        let stored = {
            let scan = self.rw.scan().primary::<StoredAssetEvent>()?;
            let iter = scan.all()?;
            let stored: std::result::Result<Vec<StoredAssetEvent>, _> = iter.collect();
            stored.map_err(|e| Error::Database(e.to_string()))?
        };
        for event in stored.into_iter().filter(|e| e.asset == asset.raw()) {
            self.rw.remove(event)?;
        }
        Ok(())
    }

    /// Delete a changeset row.
    pub fn delete_changeset(&self, id: ChangesetId) -> Result<()> {
        let stored: Option<StoredChangeset> = self.rw.get().primary(id.raw())?;
        if let Some(s) = stored {
            self.rw.remove(s)?;
        }
        Ok(())
    }
}
