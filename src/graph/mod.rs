//! Component graph: construction, cycle checks and dependency-ordered traversal.

pub mod build;
pub mod schedule;

pub use build::{ComponentGraph, Edge, GraphNode, NodeId};
