//! Application error types for the persistence layer.

use thiserror::Error;

/// Application-level errors for Stratum.
#[derive(Error, Debug)]
pub enum AppError {
    // Repository configuration errors - fatal, raised eagerly
    #[error("no primary key defined for entity {0}")]
    NoPrimaryKey(&'static str),

    #[error("entity {0} has no key value and no key generator")]
    MissingKey(&'static str),

    #[error("field '{field}' on entity {entity} rejected value of the wrong type")]
    InvalidFieldValue {
        entity: &'static str,
        field: String,
    },

    #[error("merge on {entity} sets both an include list and an exclude list")]
    ConflictingMergeFieldLists { entity: &'static str },

    #[error("merge-by property '{property}' does not resolve to exactly one field on {entity}")]
    AmbiguousMergeProperty {
        entity: &'static str,
        property: String,
    },

    // Unit-of-work misuse
    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),

    // Underlying storage failures - propagated unmodified
    #[error(transparent)]
    Store(#[from] StoreError),

    // Object storage (blob) errors
    #[error("object not found in storage: {0}")]
    ObjectNotFound(String),

    #[error("object storage error: {0}")]
    ObjectStorage(String),

    // Image domain errors
    #[error("image not found: {0}")]
    ImageNotFound(String),

    // Config errors
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Misuse of a unit-of-work scope. Never swallowed, always surfaced.
#[derive(Error, Debug)]
pub enum UnitOfWorkError {
    #[error("unit of work scope is rolled back")]
    RolledBack,
}

/// Failures raised by the underlying mapping engine.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key {key} on insert into {entity}")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("row {key} not found in {entity}")]
    RowNotFound { entity: &'static str, key: String },

    #[error("entity {0} reached flush without a key")]
    UnassignedKey(&'static str),

    #[error("transaction already open on context {0}")]
    TransactionActive(String),

    #[error("context {0} does not support transactions")]
    TransactionsUnsupported(String),
}
