//! Tree consistency operations
//!
//! All placement mutations go through [`TreeEngine`]: attaching roots
//! and children, moving subtrees, removing assets from the tree and
//! flipping a model's container flag. Each operation runs in one
//! transaction, checks its invariants before mutating, records its
//! events, and finishes with the empty-location pruning pass.

use crate::audit::{ChangeContext, Recorder};
use crate::config::ContainerPolicy;
use crate::error::{Error, Result};
use serde_json::json;
use std::collections::HashSet;
use trove_core::{
    AssetId, AssetState, EventType, ModelId, Node, NodeId, NodeType,
};
use trove_db::{Store, WriteTxn};

/// What to attach: a new location or an existing asset
#[derive(Debug, Clone)]
pub enum NodeSpec {
    /// A named organisational unit
    Location {
        /// Name of the location, required
        name: String,
    },
    /// An existing asset entering the tree
    Asset {
        /// The asset to place
        asset: AssetId,
        /// Optional display name for the node
        name: Option<String>,
    },
}

impl NodeSpec {
    /// Shorthand for a location spec
    pub fn location(name: impl Into<String>) -> Self {
        NodeSpec::Location { name: name.into() }
    }

    /// Shorthand for an unnamed asset spec
    pub fn asset(asset: AssetId) -> Self {
        NodeSpec::Asset { asset, name: None }
    }
}

/// Enforces the placement invariants over the store
pub struct TreeEngine<'s> {
    store: &'s Store,
    policy: ContainerPolicy,
}

impl<'s> TreeEngine<'s> {
    /// Create an engine with the given container policy
    pub fn new(store: &'s Store, policy: ContainerPolicy) -> Self {
        Self { store, policy }
    }

    /// The backing store
    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// Attach a node at the root of the tree.
    pub fn attach_root(&self, spec: NodeSpec, ctx: &ChangeContext) -> Result<Node> {
        self.attach_inner(spec, None, ctx)
    }

    /// Attach a node under a parent.
    pub fn attach(&self, spec: NodeSpec, parent: NodeId, ctx: &ChangeContext) -> Result<Node> {
        self.attach_inner(spec, Some(parent), ctx)
    }

    fn attach_inner(
        &self,
        spec: NodeSpec,
        parent: Option<NodeId>,
        ctx: &ChangeContext,
    ) -> Result<Node> {
        let txn = self.store.begin_write()?;

        if let Some(parent_id) = parent {
            let parent_node = txn
                .node(parent_id)?
                .ok_or(Error::NodeNotFound(parent_id))?;
            self.ensure_container(&txn, &parent_node)?;
        }

        let node = match spec {
            NodeSpec::Location { name } => {
                if name.trim().is_empty() {
                    return Err(Error::LocationNameRequired);
                }
                Node::location(txn.next_node_id()?, name, parent)
            }
            NodeSpec::Asset { asset, name } => {
                let mut record = txn.asset(asset)?.ok_or(Error::AssetNotFound(asset))?;
                if record.state.is_terminal() {
                    return Err(Error::AssetDisposed(asset));
                }
                if txn.node_by_asset(asset)?.is_some() {
                    return Err(Error::AlreadyPlaced(asset));
                }
                record.state = AssetState::Known;
                record.touch();
                txn.update_asset(&record)?;
                Node::asset(txn.next_node_id()?, asset, name, parent)
            }
        };
        txn.insert_node(&node)?;

        if let Some(asset) = node.asset {
            // A second placement of the same asset is a move in the
            // audit trail, even after it left the tree in between.
            let placed_before = txn
                .events_for_asset(asset)?
                .iter()
                .any(|e| e.event_type == EventType::Create);
            let event_type = if placed_before {
                EventType::Move
            } else {
                EventType::Create
            };
            let mut recorder = Recorder::begin(&txn, ctx)?;
            recorder.record(
                event_type,
                asset,
                json!({ "old": null, "new": parent.map(|p| p.raw()) }),
            )?;
        }

        txn.commit()?;
        Ok(node)
    }

    /// Move a node under a new parent, or to the root with `None`.
    ///
    /// The cycle check runs before anything is written: attaching a
    /// node beneath its own descendant fails with
    /// [`Error::CycleDetected`] and leaves the store untouched.
    pub fn move_node(
        &self,
        node_id: NodeId,
        new_parent: Option<NodeId>,
        ctx: &ChangeContext,
    ) -> Result<Node> {
        let txn = self.store.begin_write()?;
        let mut node = txn.node(node_id)?.ok_or(Error::NodeNotFound(node_id))?;

        if let Some(parent_id) = new_parent {
            let parent_node = txn
                .node(parent_id)?
                .ok_or(Error::NodeNotFound(parent_id))?;
            self.assert_no_cycle(&txn, node_id, parent_id)?;
            self.ensure_container(&txn, &parent_node)?;
        }

        let old_parent = node.parent;
        if old_parent == new_parent {
            return Ok(node);
        }

        node.parent = new_parent;
        node.touch();
        txn.update_node(&node)?;

        if let Some(asset) = node.asset {
            let mut recorder = Recorder::begin(&txn, ctx)?;
            recorder.record(
                EventType::Move,
                asset,
                json!({
                    "old": old_parent.map(|p| p.raw()),
                    "new": new_parent.map(|p| p.raw()),
                }),
            )?;
        }

        self.prune_upward(&txn, old_parent)?;
        txn.commit()?;
        Ok(node)
    }

    /// Remove a node (and with `recursive`, its subtree) from the tree,
    /// transitioning every affected asset to `target`.
    ///
    /// A non-recursive call on a node with descendants fails with
    /// [`Error::NonEmptyNode`] and leaves the subtree intact.
    pub fn mark_out_of_tree(
        &self,
        node_id: NodeId,
        recursive: bool,
        target: AssetState,
        ctx: &ChangeContext,
    ) -> Result<()> {
        if target == AssetState::Known {
            return Err(Error::InvalidTargetState);
        }

        let txn = self.store.begin_write()?;
        let node = txn.node(node_id)?.ok_or(Error::NodeNotFound(node_id))?;

        if !recursive && !txn.children(node_id)?.is_empty() {
            return Err(Error::NonEmptyNode(node_id));
        }

        // Collect the subtree with an explicit worklist; deep chains
        // must not recurse.
        let mut subtree = Vec::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            for child in txn.children(current.id)? {
                stack.push(child);
            }
            subtree.push(current);
        }

        let old_parent = node.parent;
        let mut recorder = Recorder::begin(&txn, ctx)?;
        for n in &subtree {
            if let Some(asset) = n.asset {
                let mut record = txn.asset(asset)?.ok_or(Error::AssetNotFound(asset))?;
                record.state = target;
                record.touch();
                txn.update_asset(&record)?;
                recorder.record(
                    EventType::Move,
                    asset,
                    json!({
                        "old": n.parent.map(|p| p.raw()),
                        "new": null,
                        "state": target.tag(),
                    }),
                )?;
            }
            txn.delete_node(n.id)?;
        }

        self.prune_upward(&txn, old_parent)?;
        txn.commit()?;
        Ok(())
    }

    /// Set or clear a model's container flag.
    ///
    /// Clearing is rejected with [`Error::ContainerStateConflict`] while
    /// any node wrapping an asset of the model still has children; the
    /// check and the update share one transaction.
    pub fn set_container(&self, model_id: ModelId, is_container: bool) -> Result<()> {
        let txn = self.store.begin_write()?;
        let mut model = txn.model(model_id)?.ok_or(Error::ModelNotFound(model_id))?;

        if !is_container {
            for node in txn.all_nodes()? {
                let Some(asset_id) = node.asset else {
                    continue;
                };
                let Some(asset) = txn.asset(asset_id)? else {
                    continue;
                };
                if asset.model == model_id && !txn.children(node.id)?.is_empty() {
                    return Err(Error::ContainerStateConflict(model_id));
                }
            }
        }

        model.is_container = is_container;
        model.updated_at = chrono::Utc::now();
        txn.update_model(&model)?;
        txn.commit()?;
        Ok(())
    }

    /// Delete an asset entirely: its node (which must be empty), its
    /// codes and its events all go with it.
    pub fn delete_asset(&self, asset: AssetId, _ctx: &ChangeContext) -> Result<()> {
        let txn = self.store.begin_write()?;
        if txn.asset(asset)?.is_none() {
            return Err(Error::AssetNotFound(asset));
        }

        let mut old_parent = None;
        if let Some(node) = txn.node_by_asset(asset)? {
            if !txn.children(node.id)?.is_empty() {
                return Err(Error::NonEmptyNode(node.id));
            }
            old_parent = node.parent;
            txn.delete_node(node.id)?;
        }

        txn.delete_events_for_asset(asset)?;
        txn.delete_asset(asset)?;
        self.prune_upward(&txn, old_parent)?;
        txn.commit()?;
        Ok(())
    }

    /// Walk upward from a former parent, deleting every location that
    /// is now empty, until a non-empty ancestor stops the walk.
    pub(crate) fn prune_upward(&self, txn: &WriteTxn<'_>, from: Option<NodeId>) -> Result<u32> {
        let mut pruned = 0;
        let mut current = from;
        while let Some(id) = current {
            let Some(node) = txn.node(id)? else {
                break;
            };
            if node.node_type != NodeType::Location || !txn.children(id)?.is_empty() {
                break;
            }
            txn.delete_node(id)?;
            pruned += 1;
            current = node.parent;
        }
        Ok(pruned)
    }

    /// Verify the target parent is not the node itself or one of its
    /// descendants, by walking the target's ancestors.
    fn assert_no_cycle(&self, txn: &WriteTxn<'_>, node: NodeId, target: NodeId) -> Result<()> {
        if node == target {
            return Err(Error::CycleDetected(node));
        }
        let mut seen = HashSet::from([target]);
        let mut current = target;
        while let Some(ancestor) = txn.node(current)?.and_then(|n| n.parent) {
            if ancestor == node {
                return Err(Error::CycleDetected(node));
            }
            if !seen.insert(ancestor) {
                break;
            }
            current = ancestor;
        }
        Ok(())
    }

    /// Check that a prospective parent can hold children, promoting its
    /// model when the policy allows it.
    fn ensure_container(&self, txn: &WriteTxn<'_>, parent: &Node) -> Result<()> {
        let Some(asset_id) = parent.asset else {
            // Locations are always containers.
            return Ok(());
        };
        let asset = txn
            .asset(asset_id)?
            .ok_or(Error::AssetNotFound(asset_id))?;
        let mut model = txn
            .model(asset.model)?
            .ok_or(Error::ModelNotFound(asset.model))?;
        if model.is_container {
            return Ok(());
        }
        match self.policy {
            ContainerPolicy::Reject => Err(Error::NotContainer(asset_id)),
            ContainerPolicy::AutoPromote => {
                model.is_container = true;
                model.updated_at = chrono::Utc::now();
                txn.update_model(&model)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::{Asset, AssetModel, Manufacturer};

    struct Fixture {
        store: Store,
        asset: AssetId,
        container: AssetId,
        model: ModelId,
        container_model: ModelId,
    }

    fn fixture() -> Fixture {
        let store = Store::in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let m = Manufacturer::new(txn.next_manufacturer_id().unwrap(), "Acme");
        txn.insert_manufacturer(&m).unwrap();
        let model = AssetModel::new(txn.next_model_id().unwrap(), "Widget", m.id);
        txn.insert_model(&model).unwrap();
        let container_model =
            AssetModel::new(txn.next_model_id().unwrap(), "Crate", m.id).container(true);
        txn.insert_model(&container_model).unwrap();
        let asset = Asset::new(txn.next_asset_id().unwrap(), model.id);
        txn.insert_asset(&asset).unwrap();
        let container = Asset::new(txn.next_asset_id().unwrap(), container_model.id);
        txn.insert_asset(&container).unwrap();
        txn.commit().unwrap();
        Fixture {
            store,
            asset: asset.id,
            container: container.id,
            model: model.id,
            container_model: container_model.id,
        }
    }

    fn ctx() -> ChangeContext {
        ChangeContext::new("tester", "")
    }

    fn engine(store: &Store) -> TreeEngine<'_> {
        TreeEngine::new(store, ContainerPolicy::Reject)
    }

    #[test]
    fn test_attach_location_hierarchy() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        let shelf = tree
            .attach(NodeSpec::location("shelf"), root.id, &ctx())
            .unwrap();
        assert_eq!(shelf.parent, Some(root.id));
        assert_eq!(f.store.children(root.id).unwrap().len(), 1);
        assert_eq!(f.store.ancestors(shelf.id).unwrap()[0].id, root.id);
    }

    #[test]
    fn test_location_requires_name() {
        let f = fixture();
        let tree = engine(&f.store);
        let err = tree
            .attach_root(NodeSpec::location("  "), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::LocationNameRequired));
    }

    #[test]
    fn test_attach_asset_records_create_then_move() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        let node = tree
            .attach(NodeSpec::asset(f.asset), root.id, &ctx())
            .unwrap();
        assert_eq!(node.asset, Some(f.asset));

        let events = f.store.events_for_asset(f.asset).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Create);

        // Leaving and re-entering the tree is a move, not a second create.
        tree.mark_out_of_tree(node.id, false, AssetState::Lost, &ctx())
            .unwrap();
        assert_eq!(
            f.store.asset(f.asset).unwrap().unwrap().state,
            AssetState::Lost
        );
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        tree.attach(NodeSpec::asset(f.asset), root.id, &ctx())
            .unwrap();
        let events = f.store.events_for_asset(f.asset).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events
                .iter()
                .filter(|e| e.event_type == EventType::Create)
                .count(),
            1
        );
        assert_eq!(
            f.store.asset(f.asset).unwrap().unwrap().state,
            AssetState::Known
        );
    }

    #[test]
    fn test_attach_rejects_double_placement_and_disposed() {
        let f = fixture();
        let tree = engine(&f.store);
        tree.attach_root(NodeSpec::asset(f.asset), &ctx()).unwrap();
        let err = tree
            .attach_root(NodeSpec::asset(f.asset), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyPlaced(_)));

        let node = f.store.node_by_asset(f.container).unwrap();
        assert!(node.is_none());
        let root = tree
            .attach_root(NodeSpec::asset(f.container), &ctx())
            .unwrap();
        tree.mark_out_of_tree(root.id, false, AssetState::Disposed, &ctx())
            .unwrap();
        let err = tree
            .attach_root(NodeSpec::asset(f.container), &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::AssetDisposed(_)));
    }

    #[test]
    fn test_container_policy_reject_and_auto_promote() {
        let f = fixture();

        // A is not a container: attaching B under A is rejected and the
        // store stays untouched.
        let strict = engine(&f.store);
        let a_node = strict.attach_root(NodeSpec::asset(f.asset), &ctx()).unwrap();
        let err = strict
            .attach(NodeSpec::asset(f.container), a_node.id, &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::NotContainer(_)));
        assert!(f.store.node_by_asset(f.container).unwrap().is_none());
        assert!(!f.store.model(f.model).unwrap().unwrap().is_container);

        // Under auto-promotion the same attach succeeds and flips the
        // model as a side effect.
        let lenient = TreeEngine::new(&f.store, ContainerPolicy::AutoPromote);
        let node = lenient
            .attach(NodeSpec::asset(f.container), a_node.id, &ctx())
            .unwrap();
        assert_eq!(node.parent, Some(a_node.id));
        assert!(f.store.model(f.model).unwrap().unwrap().is_container);
    }

    #[test]
    fn test_attach_under_container_asset() {
        let f = fixture();
        let tree = engine(&f.store);
        let crate_node = tree
            .attach_root(NodeSpec::asset(f.container), &ctx())
            .unwrap();
        let inner = tree
            .attach(NodeSpec::asset(f.asset), crate_node.id, &ctx())
            .unwrap();
        assert_eq!(inner.parent, Some(crate_node.id));
    }

    #[test]
    fn test_move_rejects_cycles_without_mutation() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("a"), &ctx())
            .unwrap();
        let mid = tree
            .attach(NodeSpec::location("b"), root.id, &ctx())
            .unwrap();
        let leaf = tree
            .attach(NodeSpec::location("c"), mid.id, &ctx())
            .unwrap();

        for target in [root.id, mid.id, leaf.id] {
            let err = tree.move_node(root.id, Some(target), &ctx()).unwrap_err();
            assert!(matches!(err, Error::CycleDetected(_)), "target {target}");
        }
        // Store untouched: the chain is as built.
        assert!(f.store.node(root.id).unwrap().unwrap().parent.is_none());
        assert_eq!(
            f.store.node(leaf.id).unwrap().unwrap().parent,
            Some(mid.id)
        );
    }

    #[test]
    fn test_move_records_event_and_prunes_old_chain() {
        let f = fixture();
        let tree = engine(&f.store);
        let old_root = tree
            .attach_root(NodeSpec::location("old"), &ctx())
            .unwrap();
        let old_shelf = tree
            .attach(NodeSpec::location("old-shelf"), old_root.id, &ctx())
            .unwrap();
        let new_root = tree
            .attach_root(NodeSpec::location("new"), &ctx())
            .unwrap();
        let node = tree
            .attach(NodeSpec::asset(f.asset), old_shelf.id, &ctx())
            .unwrap();

        let moved = tree
            .move_node(node.id, Some(new_root.id), &ctx())
            .unwrap();
        assert_eq!(moved.parent, Some(new_root.id));

        // The emptied old chain is gone.
        assert!(f.store.node(old_shelf.id).unwrap().is_none());
        assert!(f.store.node(old_root.id).unwrap().is_none());

        let events = f.store.events_for_asset(f.asset).unwrap();
        assert_eq!(events.last().unwrap().event_type, EventType::Move);
    }

    #[test]
    fn test_mark_out_of_tree_non_recursive_fails_on_children() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        tree.attach(NodeSpec::asset(f.asset), root.id, &ctx())
            .unwrap();

        let err = tree
            .mark_out_of_tree(root.id, false, AssetState::Lost, &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::NonEmptyNode(_)));
        // Subtree intact.
        assert!(f.store.node(root.id).unwrap().is_some());
        assert!(f.store.node_by_asset(f.asset).unwrap().is_some());
    }

    #[test]
    fn test_mark_out_of_tree_recursive_transitions_assets() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        let crate_node = tree
            .attach(NodeSpec::asset(f.container), root.id, &ctx())
            .unwrap();
        tree.attach(NodeSpec::asset(f.asset), crate_node.id, &ctx())
            .unwrap();

        tree.mark_out_of_tree(crate_node.id, true, AssetState::Lost, &ctx())
            .unwrap();
        for id in [f.asset, f.container] {
            assert_eq!(
                f.store.asset(id).unwrap().unwrap().state,
                AssetState::Lost
            );
            assert!(f.store.node_by_asset(id).unwrap().is_none());
        }
        // The emptied root location was pruned too.
        assert!(f.store.node(root.id).unwrap().is_none());
    }

    #[test]
    fn test_mark_out_of_tree_rejects_known_target() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        let err = tree
            .mark_out_of_tree(root.id, false, AssetState::Known, &ctx())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTargetState));
    }

    #[test]
    fn test_pruning_stops_at_first_non_empty_ancestor() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        // Keep the root non-empty with a sibling.
        tree.attach(NodeSpec::location("occupied"), root.id, &ctx())
            .unwrap();
        let a = tree
            .attach(NodeSpec::location("a"), root.id, &ctx())
            .unwrap();
        let b = tree.attach(NodeSpec::location("b"), a.id, &ctx()).unwrap();
        let node = tree
            .attach(NodeSpec::asset(f.asset), b.id, &ctx())
            .unwrap();

        tree.mark_out_of_tree(node.id, false, AssetState::Lost, &ctx())
            .unwrap();
        assert!(f.store.node(b.id).unwrap().is_none());
        assert!(f.store.node(a.id).unwrap().is_none());
        assert!(f.store.node(root.id).unwrap().is_some());
    }

    #[test]
    fn test_deep_chain_removal_uses_worklist() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("level-0"), &ctx())
            .unwrap();
        let mut parent = root.id;
        for level in 1..=100 {
            parent = tree
                .attach(NodeSpec::location(format!("level-{level}")), parent, &ctx())
                .unwrap()
                .id;
        }
        tree.attach(NodeSpec::asset(f.asset), parent, &ctx())
            .unwrap();

        tree.mark_out_of_tree(root.id, true, AssetState::Lost, &ctx())
            .unwrap();
        assert!(f.store.nodes().unwrap().is_empty());
        assert_eq!(
            f.store.asset(f.asset).unwrap().unwrap().state,
            AssetState::Lost
        );
    }

    #[test]
    fn test_set_container_downgrade_guard() {
        let f = fixture();
        let tree = engine(&f.store);
        let crate_node = tree
            .attach_root(NodeSpec::asset(f.container), &ctx())
            .unwrap();
        tree.attach(NodeSpec::asset(f.asset), crate_node.id, &ctx())
            .unwrap();

        let err = tree.set_container(f.container_model, false).unwrap_err();
        assert!(matches!(err, Error::ContainerStateConflict(_)));
        assert!(f
            .store
            .model(f.container_model)
            .unwrap()
            .unwrap()
            .is_container);

        // Empty the crate; the downgrade now goes through.
        let inner = f.store.node_by_asset(f.asset).unwrap().unwrap();
        tree.mark_out_of_tree(inner.id, false, AssetState::Lost, &ctx())
            .unwrap();
        tree.set_container(f.container_model, false).unwrap();
        assert!(!f
            .store
            .model(f.container_model)
            .unwrap()
            .unwrap()
            .is_container);
    }

    #[test]
    fn test_delete_asset_cascades() {
        let f = fixture();
        let tree = engine(&f.store);
        let root = tree
            .attach_root(NodeSpec::location("warehouse"), &ctx())
            .unwrap();
        tree.attach(NodeSpec::asset(f.asset), root.id, &ctx())
            .unwrap();
        let txn = f.store.begin_write().unwrap();
        txn.insert_code(&trove_core::AssetCode {
            id: txn.next_code_id().unwrap(),
            code: "GONE".to_string(),
            code_type: trove_core::CodeType::Arbitrary,
            asset: f.asset,
        })
        .unwrap();
        txn.commit().unwrap();

        tree.delete_asset(f.asset, &ctx()).unwrap();
        assert!(f.store.asset(f.asset).unwrap().is_none());
        assert!(f.store.asset_by_code("GONE").unwrap().is_none());
        assert!(f.store.events_for_asset(f.asset).unwrap().is_empty());
        // Its emptied location went with it.
        assert!(f.store.node(root.id).unwrap().is_none());
    }
}
