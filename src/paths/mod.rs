//! Dynamic path resolution: compiled accessors and eager-load metadata.

mod registry;
mod resolver;

pub use registry::{
    related_paths, resolve_includes, IncludePlan, IncludeSpec, RelatedPathFlags,
};
pub use resolver::{resolve, ResolvedPath};
