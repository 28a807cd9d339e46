//! Tree integrity checking
//!
//! A read-mostly pass over the whole store that reports invariant
//! violations, and with autofix enabled deletes empty location chains.
//! Findings are logged as warnings and returned in a report.

use crate::error::Result;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use trove_core::{AssetState, NodeId, NodeType};
use trove_db::Store;

/// Outcome of an integrity check
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Human-readable problem descriptions
    pub problems: Vec<String>,
    /// Number of repairs applied
    pub fixes: u32,
}

impl CheckReport {
    /// Whether the tree passed without findings
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, message: String) {
        warn!("{message}");
        self.problems.push(message);
    }
}

/// Checks the placement tree against its invariants
pub struct IntegrityChecker<'s> {
    store: &'s Store,
    autofix: bool,
}

impl<'s> IntegrityChecker<'s> {
    /// Create a checker that only reports
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            autofix: false,
        }
    }

    /// Enable or disable repairs
    pub fn autofix(mut self, autofix: bool) -> Self {
        self.autofix = autofix;
        self
    }

    /// Run the check.
    pub fn run(&self) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        let nodes = self.store.nodes()?;
        let ids: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let mut child_counts: HashMap<NodeId, usize> = HashMap::new();
        let mut assets_seen: HashMap<trove_core::AssetId, NodeId> = HashMap::new();

        for node in &nodes {
            if let Some(parent) = node.parent {
                *child_counts.entry(parent).or_insert(0) += 1;
            }
        }

        for node in &nodes {
            if let Err(message) = node.check_shape() {
                report.problem(format!("Node {}: {}", node.id, message));
            }

            if node.parent == Some(node.id) {
                report.problem(format!("Node {} is its own parent", node.id));
            } else if let Some(parent) = node.parent {
                if !ids.contains(&parent) {
                    report.problem(format!(
                        "Node {} has a dangling parent {}",
                        node.id, parent
                    ));
                }
            }

            let has_children = child_counts.get(&node.id).copied().unwrap_or(0) > 0;

            if let Some(asset_id) = node.asset {
                if let Some(other) = assets_seen.insert(asset_id, node.id) {
                    report.problem(format!(
                        "Asset {} is wrapped by both node {} and node {}",
                        asset_id, other, node.id
                    ));
                }
                match self.store.asset(asset_id)? {
                    None => {
                        report.problem(format!(
                            "Node {} links a missing asset {}",
                            node.id, asset_id
                        ));
                    }
                    Some(asset) => {
                        if asset.state != AssetState::Known {
                            report.problem(format!(
                                "Node {} links asset {} that is not in a known state",
                                node.id, asset_id
                            ));
                        }
                        match self.store.model(asset.model)? {
                            None => {
                                report.problem(format!(
                                    "Asset {} references a missing model {}",
                                    asset_id, asset.model
                                ));
                            }
                            Some(model) => {
                                if has_children && !model.is_container {
                                    report.problem(format!(
                                        "Node {} has children but asset {} is not a container",
                                        node.id, asset_id
                                    ));
                                }
                            }
                        }
                    }
                }
            }

            if node.node_type == NodeType::Location && !has_children {
                report.problem(format!(
                    "Location {} has no assets or child locations",
                    node.id
                ));
            }
        }

        // Placement correlation from the asset side: a known asset
        // should be somewhere in the tree.
        for asset in self.store.assets()? {
            if asset.state == AssetState::Known && !assets_seen.contains_key(&asset.id) {
                report.problem(format!(
                    "Asset {} is in a known state but not placed in the tree",
                    asset.id
                ));
            }
        }

        if self.autofix {
            report.fixes += self.prune_empty_locations(&nodes, &child_counts)?;
        }

        Ok(report)
    }

    /// Delete empty locations, cascading up chains that empty out.
    fn prune_empty_locations(
        &self,
        nodes: &[trove_core::Node],
        child_counts: &HashMap<NodeId, usize>,
    ) -> Result<u32> {
        let mut counts = child_counts.clone();
        let by_id: HashMap<NodeId, &trove_core::Node> = nodes.iter().map(|n| (n.id, n)).collect();
        let txn = self.store.begin_write()?;
        let mut fixes = 0;

        let mut worklist: Vec<NodeId> = nodes
            .iter()
            .filter(|n| {
                n.node_type == NodeType::Location && counts.get(&n.id).copied().unwrap_or(0) == 0
            })
            .map(|n| n.id)
            .collect();

        let mut deleted = HashSet::new();
        while let Some(id) = worklist.pop() {
            if !deleted.insert(id) {
                continue;
            }
            info!("Autofix: deleting empty location {id}");
            txn.delete_node(id)?;
            fixes += 1;
            if let Some(parent) = by_id.get(&id).and_then(|n| n.parent) {
                let count = counts.entry(parent).or_insert(0);
                *count = count.saturating_sub(1);
                if *count == 0
                    && by_id
                        .get(&parent)
                        .is_some_and(|n| n.node_type == NodeType::Location)
                {
                    worklist.push(parent);
                }
            }
        }

        txn.commit()?;
        Ok(fixes)
    }
}
