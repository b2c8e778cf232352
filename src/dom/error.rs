//! Error types for host tree mutation

use thiserror::Error;

use super::NodeId;

/// Errors that can occur while mutating the host tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The handle does not refer to a live node
    #[error("{node} is not a live node")]
    StaleNode { node: NodeId },

    /// Text nodes cannot hold children
    #[error("{node} cannot hold children")]
    NotAContainer { node: NodeId },

    /// The move would make a node its own ancestor, or move the root
    #[error("cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The node has no parent to be replaced in
    #[error("{node} is not attached to a parent")]
    Detached { node: NodeId },
}
