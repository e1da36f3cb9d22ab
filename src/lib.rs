//! Stratum - generic persistence toolkit over an in-memory mapping engine.
//!
//! Typed repositories with dynamic sort/include paths, sparse patches, and a
//! reentrant unit-of-work scope spanning multiple persistence contexts.

pub mod config;
pub mod context;
pub mod di;
pub mod entity;
pub mod error;
pub mod models;
pub mod paths;
pub mod query;
pub mod repository;
pub mod services;
pub mod storage;
pub mod store;
pub mod uow;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
