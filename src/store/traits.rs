//! Persistence-context abstraction the unit of work fans out over.

use async_trait::async_trait;

use crate::error::StoreError;

/// One persistence context: a change tracker plus backing tables.
///
/// The unit of work holds a set of these and drives flush / transaction /
/// detach uniformly across them without knowing the engine behind each.
#[async_trait]
pub trait DataContext: Send + Sync {
    fn name(&self) -> &str;

    /// Whether [`DataContext::begin_transaction`] is usable. Contexts without
    /// transaction support still participate in flush fan-out.
    fn supports_transactions(&self) -> bool;

    fn in_transaction(&self) -> bool;

    /// Applies every pending change to the backing tables, in the order the
    /// changes were tracked.
    async fn flush(&self) -> Result<(), StoreError>;

    async fn begin_transaction(&self) -> Result<Box<dyn ContextTransaction>, StoreError>;

    /// Discards pending (unflushed) changes without touching committed state.
    fn detach_pending(&self);
}

/// An open transaction on one context. Consuming by design: a transaction is
/// either committed or rolled back exactly once.
#[async_trait]
pub trait ContextTransaction: Send + Sync {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
