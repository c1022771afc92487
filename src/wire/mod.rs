//! Attribute wiring between components, plus limit propagation.
//!
//! Wiring runs in two stages over every graph edge. Stage one makes the live
//! links, copies and proxies and collects the hierarchical kinds that depend on
//! what stage one produced. Stage two turns those pending links into parent
//! follows and space switches.

pub mod connect;
pub mod limits;

use crate::host::SpaceOption;
use crate::spec::{AttrPath, ConnectionKind};
use serde::Serialize;

pub use connect::{resolve_edge, wire_deferred, wire_direct};
pub use limits::propagate_limits;

/// A completed attribute connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub src: AttrPath,
    pub dst: AttrPath,
    pub kind: ConnectionKind,
}

/// A hierarchical pair held back until every stage-one link exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLink {
    pub src: AttrPath,
    pub dst: AttrPath,
    pub kind: ConnectionKind,
    /// Full name of the component that provides `src`.
    pub source_component: String,
    pub space_name: Option<String>,
}

/// Result of one space-switch construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceSwitchSummary {
    pub dst: AttrPath,
    pub options: Vec<SpaceOption>,
    pub active: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Wiring {
    pub links: Vec<Link>,
    pub pending: Vec<PendingLink>,
    pub space_switches: Vec<SpaceSwitchSummary>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }
}
