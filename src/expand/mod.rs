//! Template expansion: blueprints, side mirroring, default attributes.

pub mod blueprint;
pub mod defaults;
pub mod mirror;

pub use blueprint::{BlueprintCatalog, BlueprintSource, BlueprintSpec, DirectorySource, expand};
pub use defaults::{DefaultAttrSet, merge_all, merge_defaults};
pub use mirror::split_sides;
