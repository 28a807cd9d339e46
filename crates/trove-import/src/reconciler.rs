//! Bulk import reconciliation
//!
//! Converges a historical dataset onto the placement tree in three
//! stages: seed every declared location and every asset without
//! placement, then run a bounded fixed-point loop that attaches each
//! still-unplaced asset once its declared parent exists in the tree.
//! Forward references resolve over the rounds; references that never
//! resolve are logged and skipped, not fatal.

use crate::error::Result;
use crate::loader::Loader;
use crate::records::{AssetRecord, ChangesetRecord, EventRecord};
use std::path::Path;
use tracing::{debug, info, warn};
use trove_core::{
    Asset, AssetId, AssetModel, AssetState, CodeRegistry, CodeType, ExtraData, Manufacturer,
    NodeId,
};
use trove_db::Store;
use trove_engine::{ChangeContext, CodeAllocator, EngineConfig, Error as EngineError, NodeSpec, TreeEngine};

/// Upper bound on fixed-point placement rounds.
const MAX_ROUNDS: u32 = 30;

/// Manufacturer assigned to models the dataset knows nothing about.
const UNKNOWN_MANUFACTURER: &str = "Unknown";

/// Location that collects assets whose legacy reference never resolves.
const UNKNOWN_LOCATION: &str = "unknown";

/// Outcome of an import run
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Changeset records processed
    pub records: usize,
    /// Assets created
    pub assets_created: usize,
    /// Location nodes created
    pub locations_created: usize,
    /// Codes attached to created assets
    pub codes_attached: usize,
    /// Records skipped because their code was already imported
    pub duplicates_skipped: usize,
    /// Assets attached to the tree
    pub placed: usize,
    /// Fixed-point rounds executed
    pub rounds: u32,
    /// References that never resolved, with their asset codes
    pub unresolved: Vec<String>,
}

/// An asset awaiting placement under its declared parent.
#[derive(Debug)]
struct PendingPlacement {
    asset: AssetId,
    code: String,
    reference: String,
    ctx: ChangeContext,
}

/// What one placement attempt did.
enum Placement {
    Placed,
    Deferred,
    Skipped(String),
}

/// Converges historical datasets onto the store
pub struct Importer<'s> {
    store: &'s Store,
    tree: TreeEngine<'s>,
    allocator: CodeAllocator<'s>,
    registry: CodeRegistry,
}

impl<'s> Importer<'s> {
    /// Create an importer with the lenient import configuration
    /// (container auto-promotion on).
    pub fn new(store: &'s Store) -> Self {
        Self::with_config(store, EngineConfig::importing())
    }

    /// Create an importer with an explicit configuration
    pub fn with_config(store: &'s Store, config: EngineConfig) -> Self {
        Self {
            store,
            tree: TreeEngine::new(store, config.container_policy),
            allocator: CodeAllocator::new(store, &config),
            registry: CodeRegistry::new(config.code_config.clone()),
        }
    }

    /// Import every dataset file in a directory.
    pub fn import_dir(&mut self, path: impl AsRef<Path>) -> Result<ImportReport> {
        let mut loader = Loader::new();
        loader.load_directory(path)?;
        self.import(loader.finish())
    }

    /// Import a batch of changeset records.
    pub fn import(&mut self, records: Vec<ChangesetRecord>) -> Result<ImportReport> {
        let mut report = ImportReport {
            records: records.len(),
            ..ImportReport::default()
        };
        let mut pending: Vec<PendingPlacement> = Vec::new();
        let mut location_paths: Vec<(String, ChangeContext)> = Vec::new();

        self.ensure_manufacturer(UNKNOWN_MANUFACTURER)?;

        // Pass 1: create every asset without placement and collect the
        // declared locations.
        for record in &records {
            let timestamp = match record.parsed_timestamp() {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("skipping record from {}: {e}", record.user);
                    continue;
                }
            };
            let ctx = ChangeContext::at(&record.user, &record.comment, timestamp);

            for event in &record.events {
                match event {
                    EventRecord::Location { path } => {
                        location_paths.push((path.clone(), ctx.clone()));
                    }
                    EventRecord::Add { asset } => {
                        self.seed_asset(asset, &ctx, &mut report, &mut pending)?;
                    }
                }
            }
        }

        // Pass 2: materialise the declared location chains.
        for (path, ctx) in &location_paths {
            self.ensure_location_path(path, ctx, &mut report)?;
        }

        // Fixed point: place assets as their parents appear, bounded
        // so a cyclic dataset cannot spin forever.
        while !pending.is_empty() && report.rounds < MAX_ROUNDS {
            report.rounds += 1;
            let mut progress = false;
            let mut deferred = Vec::new();

            for item in pending.drain(..) {
                match self.try_place(&item, &mut report)? {
                    Placement::Placed => {
                        progress = true;
                        report.placed += 1;
                    }
                    Placement::Deferred => deferred.push(item),
                    Placement::Skipped(reason) => {
                        warn!("skipping asset {}: {reason}", item.code);
                        report.unresolved.push(item.code.clone());
                    }
                }
            }

            pending = deferred;
            if !progress {
                break;
            }
        }

        for item in &pending {
            warn!(
                "asset {} was never placed: reference {:?} did not resolve",
                item.code, item.reference
            );
            report.unresolved.push(item.code.clone());
        }

        info!(
            "import finished: {} assets, {} locations, {} placed, {} unresolved, {} rounds",
            report.assets_created,
            report.locations_created,
            report.placed,
            report.unresolved.len(),
            report.rounds
        );
        Ok(report)
    }

    /// Create one asset with its code, deferring placement.
    fn seed_asset(
        &mut self,
        record: &AssetRecord,
        ctx: &ChangeContext,
        report: &mut ImportReport,
        pending: &mut Vec<PendingPlacement>,
    ) -> Result<()> {
        // Re-running an import is idempotent: an already-known code
        // means the record was seen before.
        if self.store.asset_by_code(&record.asset_code)?.is_some() {
            debug!("code {} already imported", record.asset_code);
            report.duplicates_skipped += 1;
            return Ok(());
        }

        let model = self.ensure_model(&record.asset_type)?;

        let txn = self.store.begin_write()?;
        let mut asset = Asset::new(txn.next_asset_id()?, model.id);
        // Out of tree until the placement pass attaches it.
        asset.state = AssetState::Lost;
        if let serde_json::Value::Object(map) = &record.data {
            asset.extra = map.clone().into_iter().collect::<ExtraData>();
        }
        txn.insert_asset(&asset)?;
        txn.commit()?;
        report.assets_created += 1;

        let code_type = self.infer_code_type(record);
        match self
            .allocator
            .add_code(asset.id, code_type, Some(&record.asset_code))
        {
            Ok(_) => report.codes_attached += 1,
            Err(e) if e.is_duplicate_code() => {
                warn!("duplicate code {} while importing", record.asset_code);
                report.duplicates_skipped += 1;
            }
            Err(EngineError::InvalidCode(e)) => {
                warn!("code {} failed validation: {e}", record.asset_code);
            }
            Err(e) => return Err(e.into()),
        }

        pending.push(PendingPlacement {
            asset: asset.id,
            code: record.asset_code.clone(),
            reference: record.location.clone(),
            ctx: ctx.clone(),
        });
        Ok(())
    }

    /// Use the declared code type, else infer: a code that passes the
    /// legacy check is a legacy code, anything else is arbitrary.
    fn infer_code_type(&self, record: &AssetRecord) -> CodeType {
        if let Some(tag) = record.code_type.as_deref() {
            if let Ok(code_type) = CodeType::from_tag(tag) {
                return code_type;
            }
            warn!("unknown code type tag {tag:?}, inferring");
        }
        if self
            .registry
            .validate(CodeType::Legacy, &record.asset_code)
            .is_ok()
        {
            CodeType::Legacy
        } else {
            CodeType::Arbitrary
        }
    }

    /// One placement attempt for one pending asset.
    fn try_place(
        &mut self,
        item: &PendingPlacement,
        report: &mut ImportReport,
    ) -> Result<Placement> {
        // Already placed: a re-run or a duplicate record.
        if self.store.node_by_asset(item.asset)?.is_some() {
            return Ok(Placement::Placed);
        }

        let reference = item.reference.trim();
        let parent = if let Some(parent_asset) = self.store.asset_by_code(reference)? {
            match self.store.node_by_asset(parent_asset.id)? {
                Some(node) => node.id,
                // The parent exists but is not in the tree yet; a later
                // round will see it placed.
                None => return Ok(Placement::Deferred),
            }
        } else if reference.to_ascii_lowercase().starts_with("sr") && !reference.contains('/') {
            // A legacy code that resolves to nothing: the referenced
            // asset was never imported. Park the asset, loudly.
            warn!(
                "asset {} references unknown code {reference:?}, placing under {UNKNOWN_LOCATION:?}",
                item.code
            );
            self.ensure_location_path(UNKNOWN_LOCATION, &item.ctx, report)?
        } else {
            self.ensure_location_path(reference, &item.ctx, report)?
        };

        match self.tree.attach(NodeSpec::asset(item.asset), parent, &item.ctx) {
            Ok(_) => Ok(Placement::Placed),
            Err(EngineError::AlreadyPlaced(_)) => Ok(Placement::Placed),
            Err(e) => Ok(Placement::Skipped(e.to_string())),
        }
    }

    /// Walk a slash-separated path of location names, creating the
    /// missing links, and return the leaf node.
    fn ensure_location_path(
        &mut self,
        path: &str,
        ctx: &ChangeContext,
        report: &mut ImportReport,
    ) -> Result<NodeId> {
        let mut parent: Option<NodeId> = None;
        for part in path.split('/').map(str::trim).filter(|p| !p.is_empty()) {
            let existing = match parent {
                None => self.store.roots()?,
                Some(id) => self.store.children(id)?,
            }
            .into_iter()
            .find(|n| n.asset.is_none() && n.name.as_deref() == Some(part));

            parent = Some(match existing {
                Some(node) => node.id,
                None => {
                    let spec = NodeSpec::location(part);
                    let node = match parent {
                        None => self.tree.attach_root(spec, ctx)?,
                        Some(id) => self.tree.attach(spec, id, ctx)?,
                    };
                    report.locations_created += 1;
                    node.id
                }
            });
        }
        parent.ok_or_else(|| {
            trove_engine::Error::LocationNameRequired.into()
        })
    }

    /// Get or create a manufacturer by name.
    fn ensure_manufacturer(&self, name: &str) -> Result<Manufacturer> {
        if let Some(existing) = self.store.manufacturer_by_slug(&trove_core::slugify(name))? {
            return Ok(existing);
        }
        let txn = self.store.begin_write()?;
        let manufacturer = Manufacturer::new(txn.next_manufacturer_id()?, name);
        txn.insert_manufacturer(&manufacturer)?;
        txn.commit()?;
        Ok(manufacturer)
    }

    /// Get or create a model by name, under the unknown manufacturer.
    fn ensure_model(&self, name: &str) -> Result<AssetModel> {
        if let Some(existing) = self.store.model_by_slug(&trove_core::slugify(name))? {
            return Ok(existing);
        }
        let manufacturer = self.ensure_manufacturer(UNKNOWN_MANUFACTURER)?;
        let txn = self.store.begin_write()?;
        let model = AssetModel::new(txn.next_model_id()?, name, manufacturer.id);
        txn.insert_model(&model)?;
        txn.commit()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, ts: &str, events: Vec<EventRecord>) -> ChangesetRecord {
        ChangesetRecord {
            user: user.to_string(),
            timestamp: ts.to_string(),
            comment: String::new(),
            events,
        }
    }

    fn add(code: &str, model: &str, location: &str) -> EventRecord {
        EventRecord::Add {
            asset: AssetRecord {
                asset_code: code.to_string(),
                code_type: None,
                asset_type: model.to_string(),
                location: location.to_string(),
                data: serde_json::Value::Null,
            },
        }
    }

    fn location(path: &str) -> EventRecord {
        EventRecord::Location {
            path: path.to_string(),
        }
    }

    #[test]
    fn test_forward_location_reference_converges() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);

        // The asset references L1/L2 before the location record, which
        // only exists later in the same file.
        let report = importer
            .import(vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![add("X1", "Widget", "L1/L2"), location("L1/L2")],
            )])
            .unwrap();

        assert_eq!(report.assets_created, 1);
        assert_eq!(report.locations_created, 2);
        assert_eq!(report.placed, 1);
        assert!(report.rounds <= 2, "took {} rounds", report.rounds);
        assert!(report.unresolved.is_empty());

        // X1 sits under L2 under L1 under the root.
        let node = store.node_by_code("X1").unwrap().unwrap();
        let ancestors = store.ancestors(node.id).unwrap();
        let names: Vec<_> = ancestors
            .iter()
            .map(|n| n.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["L2", "L1"]);
        assert!(ancestors[1].is_root());
    }

    #[test]
    fn test_asset_under_asset_forward_reference() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);

        // "inner" goes inside "box1", whose own record comes second.
        let report = importer
            .import(vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![
                    add("inner", "Widget", "box1"),
                    add("box1", "Crate", "warehouse"),
                ],
            )])
            .unwrap();

        assert_eq!(report.assets_created, 2);
        assert_eq!(report.placed, 2);
        assert_eq!(report.rounds, 2);

        let box_node = store.node_by_code("box1").unwrap().unwrap();
        let inner_node = store.node_by_code("inner").unwrap().unwrap();
        assert_eq!(inner_node.parent, Some(box_node.id));

        // The crate model was auto-promoted when it gained a child.
        let box_asset = store.asset_by_code("box1").unwrap().unwrap();
        assert!(store.model(box_asset.model).unwrap().unwrap().is_container);

        // Both assets ended up known and audited under one changeset.
        for code in ["inner", "box1"] {
            let asset = store.asset_by_code(code).unwrap().unwrap();
            assert_eq!(asset.state, AssetState::Known);
        }
        assert_eq!(store.changesets().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_legacy_reference_parks_under_unknown() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);

        let report = importer
            .import(vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![add("srABCABJ", "Widget", "srZZZZZZ")],
            )])
            .unwrap();

        assert_eq!(report.placed, 1);
        let node = store.node_by_code("srABCABJ").unwrap().unwrap();
        let ancestors = store.ancestors(node.id).unwrap();
        assert_eq!(ancestors[0].name.as_deref(), Some("unknown"));

        // The valid legacy code was stored with the legacy type.
        let codes = store
            .codes_for_asset(store.asset_by_code("srABCABJ").unwrap().unwrap().id)
            .unwrap();
        assert_eq!(codes[0].code_type, CodeType::Legacy);
    }

    #[test]
    fn test_cyclic_references_terminate_unresolved() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);

        let report = importer
            .import(vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![add("aaa", "Widget", "bbb"), add("bbb", "Widget", "aaa")],
            )])
            .unwrap();

        assert_eq!(report.placed, 0);
        assert!(report.rounds < MAX_ROUNDS);
        let mut unresolved = report.unresolved.clone();
        unresolved.sort();
        assert_eq!(unresolved, vec!["aaa", "bbb"]);
        // Neither asset entered the tree.
        assert!(store.node_by_code("aaa").unwrap().is_none());
        assert!(store.node_by_code("bbb").unwrap().is_none());
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);
        let batch = || {
            vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![location("L1"), add("X1", "Widget", "L1")],
            )]
        };

        let first = importer.import(batch()).unwrap();
        assert_eq!(first.assets_created, 1);

        let second = importer.import(batch()).unwrap();
        assert_eq!(second.assets_created, 0);
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(store.assets().unwrap().len(), 1);
        // The events were not duplicated either.
        let asset = store.asset_by_code("X1").unwrap().unwrap();
        assert_eq!(store.events_for_asset(asset.id).unwrap().len(), 1);
    }

    #[test]
    fn test_extra_data_carried_onto_asset() {
        let store = Store::in_memory().unwrap();
        let mut importer = Importer::new(&store);

        importer
            .import(vec![record(
                "alice",
                "2019-01-01T12:00:00",
                vec![
                    location("L1"),
                    EventRecord::Add {
                        asset: AssetRecord {
                            asset_code: "X1".to_string(),
                            code_type: Some("A".to_string()),
                            asset_type: "Widget".to_string(),
                            location: "L1".to_string(),
                            data: serde_json::json!({ "colour": "red" }),
                        },
                    },
                ],
            )])
            .unwrap();

        let asset = store.asset_by_code("X1").unwrap().unwrap();
        assert_eq!(
            asset.extra.get("colour"),
            Some(&serde_json::json!("red"))
        );
    }
}
