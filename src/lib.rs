//! Rig composition: template and blueprint expansion, a component dependency
//! graph with an ordered scheduler, and attribute wiring between components.
//!
//! Scene work is delegated to an [`host::AttributeHost`]; [`host::MemoryScene`]
//! is the in-memory implementation used by the CLI and the tests.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod graph;
pub mod host;
pub mod pipeline;
pub mod report;
pub mod spec;
pub mod wire;

pub type Result<T> = anyhow::Result<T>;

pub use config::BuildConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity, Stage};
pub use error::{GraphError, HostError};
pub use pipeline::RigBuilder;
pub use report::BuildReport;
