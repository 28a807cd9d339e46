//! Error types for trove-engine

use thiserror::Error;
use trove_core::{AssetId, ModelId, NodeId};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during engine operations
#[derive(Debug, Error)]
pub enum Error {
    /// A provided code failed its strategy's validation.
    #[error("Provided asset code is not valid: {0}")]
    InvalidCode(#[source] trove_core::Error),

    /// The code format has no synthesis capability.
    #[error("Unable to generate an asset code of that type")]
    GenerationUnsupported,

    /// Every generated candidate collided with an existing code.
    #[error("Gave up generating a unique code after {0} attempts")]
    ExhaustedRetries(u32),

    /// The requested move would make a node its own ancestor.
    #[error("Moving node {0} here would create a cycle")]
    CycleDetected(NodeId),

    /// The node still has descendants and the operation was not recursive.
    #[error("Node {0} is not empty")]
    NonEmptyNode(NodeId),

    /// The target asset's model cannot contain other nodes.
    #[error("Asset {0} is not a container")]
    NotContainer(AssetId),

    /// The container flag cannot be cleared while nodes of the model
    /// have children.
    #[error("Model {0} still has nodes with children")]
    ContainerStateConflict(ModelId),

    /// The asset is already placed in the tree.
    #[error("Asset {0} is already placed in the tree")]
    AlreadyPlaced(AssetId),

    /// The asset has been disposed of; disposal is final.
    #[error("Asset {0} has been disposed of")]
    AssetDisposed(AssetId),

    /// Assets leave the tree as lost or disposed, nothing else.
    #[error("Assets can only leave the tree as lost or disposed")]
    InvalidTargetState,

    /// A location node needs a non-empty name.
    #[error("A location must have a name")]
    LocationNameRequired,

    /// An asset can appear at most once per changeset.
    #[error("Asset {0} already has an event in this changeset")]
    DuplicateEventForAsset(AssetId),

    /// Referenced node does not exist.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Referenced asset does not exist.
    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Referenced model does not exist.
    #[error("Model not found: {0}")]
    ModelNotFound(ModelId),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] trove_core::Error),

    /// Database error, including uniqueness violations surfaced verbatim
    #[error("database error: {0}")]
    Db(#[from] trove_db::Error),
}

impl Error {
    /// Whether this error wraps a store-level uniqueness violation
    pub fn is_duplicate_code(&self) -> bool {
        matches!(self, Error::Db(e) if e.is_duplicate_key())
    }
}
