use thiserror::Error;

/// Structural problems in the component graph. These abort a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("component graph contains a cycle: {}", members.join(" -> "))]
    Cycle { members: Vec<String> },
    #[error("scheduler cannot make progress; waiting on unvisited parents: {}", pending.join(", "))]
    Stalled { pending: Vec<String> },
}

/// Failures reported by an attribute host. Callers log these and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("node '{0}' does not exist")]
    MissingNode(String),
    #[error("attribute '{0}' does not exist")]
    MissingAttr(String),
    #[error("'{dst}' is already connected from '{existing}'")]
    AlreadyConnected { dst: String, existing: String },
    #[error("cannot link '{src}' to '{dst}': {reason}")]
    KindMismatch {
        src: String,
        dst: String,
        reason: String,
    },
    #[error("'{0}' is not a valid node.attr path")]
    InvalidPath(String),
    #[error("'{0}' already exists")]
    Duplicate(String),
}
