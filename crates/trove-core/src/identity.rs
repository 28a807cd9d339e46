//! Identity types for the inventory entities
//!
//! Every persisted entity is keyed by a small integer id. The ids are
//! allocated by the store; wrapping them in distinct newtypes keeps an
//! `AssetId` from being passed where a `NodeId` belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new id
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the raw id value
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Unique identifier for an asset
    AssetId,
    "asset"
);
id_type!(
    /// Unique identifier for an asset model
    ModelId,
    "model"
);
id_type!(
    /// Unique identifier for a manufacturer
    ManufacturerId,
    "manufacturer"
);
id_type!(
    /// Unique identifier for an asset code row
    CodeId,
    "code"
);
id_type!(
    /// Unique identifier for a tree node
    NodeId,
    "node"
);
id_type!(
    /// Unique identifier for a changeset
    ChangesetId,
    "changeset"
);
id_type!(
    /// Unique identifier for an asset event
    EventId,
    "event"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id() {
        let id = AssetId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "asset:42");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        let a = AssetId::new(1);
        let n = NodeId::new(1);
        assert_eq!(a.raw(), n.raw());
        assert_eq!(format!("{}", n), "node:1");
    }
}
