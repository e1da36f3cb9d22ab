//! Typed repositories over the storage engine: a read-only query surface and
//! a mutating surface layered on top of it.

mod merge;
mod query;
#[allow(clippy::module_inception)]
mod repository;

pub use merge::MergeOptions;
pub use query::{ListQuery, QueryRepository};
pub use repository::Repository;
