//! Query building blocks shared by the repository layer: sort
//! specifications, typed predicates, and paged result envelopes.

mod paging;
mod predicate;
mod sort;

pub use paging::PagedList;
pub use predicate::Predicate;
pub use sort::{order_by, SortDirection, SortItem, SortSpec};
