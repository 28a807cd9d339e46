//! Changeset recording and the audit trail
//!
//! Every mutating operation records its events through a [`Recorder`]
//! bound to the operation's transaction. Replayed history is grouped by
//! (user, comment, timestamp) so events from one historical batch land
//! in the same changeset; interactive operations always open a fresh
//! one. A changeset row is only written once it has an event, so empty
//! changesets are never committed.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use trove_core::{AssetEvent, AssetId, ChangeSet, EventType};
use trove_db::{Store, WriteTxn};

/// Attribution for one mutating operation
#[derive(Debug, Clone)]
pub struct ChangeContext {
    /// Who made the change
    pub user: String,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
    /// Replayed contexts join an existing changeset with the same
    /// attribution; interactive ones always open a fresh changeset.
    grouped: bool,
}

impl ChangeContext {
    /// A context stamped with the current time
    pub fn new(user: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            comment: comment.into(),
            timestamp: Utc::now(),
            grouped: false,
        }
    }

    /// A context with an explicit timestamp, used when replaying
    /// grouped history
    pub fn at(
        user: impl Into<String>,
        comment: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user: user.into(),
            comment: comment.into(),
            timestamp,
            grouped: true,
        }
    }
}

/// Records asset events into one changeset within a transaction.
pub(crate) struct Recorder<'a, 'db> {
    txn: &'a WriteTxn<'db>,
    changeset: ChangeSet,
    written: bool,
    seen: HashSet<AssetId>,
}

impl<'a, 'db> Recorder<'a, 'db> {
    /// Bind a recorder to a transaction, reusing a changeset with the
    /// same attribution when one exists.
    pub fn begin(txn: &'a WriteTxn<'db>, ctx: &ChangeContext) -> Result<Self> {
        let probe = ChangeSet {
            id: trove_core::ChangesetId::new(0),
            user: ctx.user.clone(),
            comment: ctx.comment.clone(),
            timestamp: ctx.timestamp,
        };
        let existing = if ctx.grouped {
            txn.find_changeset(&probe)?
        } else {
            None
        };
        let (changeset, written, seen) = match existing {
            Some(existing) => {
                let seen = txn
                    .events_for_changeset(existing.id)?
                    .into_iter()
                    .map(|e| e.asset)
                    .collect();
                (existing, true, seen)
            }
            None => {
                let fresh = ChangeSet {
                    id: txn.next_changeset_id()?,
                    ..probe
                };
                (fresh, false, HashSet::new())
            }
        };
        Ok(Self {
            txn,
            changeset,
            written,
            seen,
        })
    }

    /// Record one event for an asset.
    ///
    /// Fails with [`Error::DuplicateEventForAsset`] if the asset already
    /// appears in this changeset.
    pub fn record(
        &mut self,
        event_type: EventType,
        asset: AssetId,
        data: serde_json::Value,
    ) -> Result<()> {
        if !self.seen.insert(asset) {
            return Err(Error::DuplicateEventForAsset(asset));
        }
        if !self.written {
            self.txn.insert_changeset(&self.changeset)?;
            self.written = true;
        }
        self.txn.insert_event(&AssetEvent {
            id: self.txn.next_event_id()?,
            changeset: self.changeset.id,
            event_type,
            asset,
            data,
        })?;
        Ok(())
    }
}

/// Delete every changeset that has no events.
///
/// Normal operation never commits one, but replayed or imported stores
/// can carry them.
pub fn prune_empty_changesets(store: &Store) -> Result<usize> {
    let changesets = store.changesets()?;
    let txn = store.begin_write()?;
    let mut pruned = 0;
    for cs in changesets {
        if txn.events_for_changeset(cs.id)?.is_empty() {
            txn.delete_changeset(cs.id)?;
            pruned += 1;
        }
    }
    txn.commit()?;
    Ok(pruned)
}

/// Summary of the audit trail
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    /// Number of changesets
    pub changesets: usize,
    /// Number of events
    pub events: usize,
    /// Events by type tag
    pub events_by_type: HashMap<String, u64>,
    /// Events by user
    pub events_by_user: HashMap<String, u64>,
}

/// Generate an audit report over the whole store.
pub fn audit_report(store: &Store) -> Result<AuditReport> {
    let changesets = store.changesets()?;
    let mut report = AuditReport {
        changesets: changesets.len(),
        ..AuditReport::default()
    };
    for cs in changesets {
        for event in store.events_for_changeset(cs.id)? {
            report.events += 1;
            *report
                .events_by_type
                .entry(event.event_type.tag().to_string())
                .or_insert(0) += 1;
            *report.events_by_user.entry(cs.user.clone()).or_insert(0) += 1;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_group_by_attribution() {
        let store = Store::in_memory().unwrap();
        let ctx = ChangeContext::at("alice", "stocktake", Utc::now());

        let txn = store.begin_write().unwrap();
        let mut rec = Recorder::begin(&txn, &ctx).unwrap();
        rec.record(EventType::Create, AssetId::new(1), json!({}))
            .unwrap();
        txn.commit().unwrap();

        // Same attribution joins the existing changeset.
        let txn = store.begin_write().unwrap();
        let mut rec = Recorder::begin(&txn, &ctx).unwrap();
        rec.record(EventType::Move, AssetId::new(2), json!({}))
            .unwrap();
        txn.commit().unwrap();

        let changesets = store.changesets().unwrap();
        assert_eq!(changesets.len(), 1);
        assert_eq!(
            store
                .events_for_changeset(changesets[0].id)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_asset_at_most_once_per_changeset() {
        let store = Store::in_memory().unwrap();
        let ctx = ChangeContext::new("alice", "");

        let txn = store.begin_write().unwrap();
        let mut rec = Recorder::begin(&txn, &ctx).unwrap();
        rec.record(EventType::Create, AssetId::new(1), json!({}))
            .unwrap();
        let err = rec
            .record(EventType::Move, AssetId::new(1), json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEventForAsset(_)));
    }

    #[test]
    fn test_empty_changesets_never_commit_and_prune() {
        let store = Store::in_memory().unwrap();

        // A recorder with no events writes nothing.
        let txn = store.begin_write().unwrap();
        let _rec = Recorder::begin(&txn, &ChangeContext::new("bob", "noop")).unwrap();
        txn.commit().unwrap();
        assert!(store.changesets().unwrap().is_empty());

        // A manually inserted empty changeset is pruned.
        let txn = store.begin_write().unwrap();
        txn.insert_changeset(&ChangeSet {
            id: txn.next_changeset_id().unwrap(),
            user: "bob".to_string(),
            comment: "orphan".to_string(),
            timestamp: Utc::now(),
        })
        .unwrap();
        txn.commit().unwrap();

        assert_eq!(prune_empty_changesets(&store).unwrap(), 1);
        assert!(store.changesets().unwrap().is_empty());
    }

    #[test]
    fn test_audit_report_counts() {
        let store = Store::in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let mut rec = Recorder::begin(&txn, &ChangeContext::new("alice", "")).unwrap();
        rec.record(EventType::Create, AssetId::new(1), json!({}))
            .unwrap();
        rec.record(EventType::Move, AssetId::new(2), json!({}))
            .unwrap();
        txn.commit().unwrap();

        let report = audit_report(&store).unwrap();
        assert_eq!(report.changesets, 1);
        assert_eq!(report.events, 2);
        assert_eq!(report.events_by_type["CR"], 1);
        assert_eq!(report.events_by_type["MV"], 1);
        assert_eq!(report.events_by_user["alice"], 2);
    }
}
