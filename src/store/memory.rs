//! In-memory mapping engine: typed tables, an ordered change tracker and
//! snapshot transactions.
//!
//! Committed rows live in per-entity `BTreeMap`s. Mutations never touch the
//! tables directly; they queue pending operations that `flush` applies in
//! tracking order. A transaction snapshots every table on begin and restores
//! the snapshots on rollback, so flushed-but-uncommitted rows are visible to
//! queries inside the transaction and gone after a rollback.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::entity::Entity;
use crate::error::{AppError, StoreError};
use crate::store::{ContextTransaction, DataContext};

enum Pending<E: Entity> {
    Add(E),
    Update(E),
    Patch { stub: E, fields: Vec<String> },
    Delete(E::Key),
}

struct Table<E: Entity> {
    rows: BTreeMap<E::Key, E>,
    snapshot: Option<BTreeMap<E::Key, E>>,
    pending: Vec<Pending<E>>,
}

impl<E: Entity> Table<E> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            snapshot: None,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, op: Pending<E>) -> Result<(), StoreError> {
        let entity_name = E::static_schema().entity;
        match op {
            Pending::Add(entity) => {
                let key = entity.key().ok_or(StoreError::UnassignedKey(entity_name))?;
                if self.rows.contains_key(&key) {
                    return Err(StoreError::DuplicateKey {
                        entity: entity_name,
                        key: E::display_key(&key),
                    });
                }
                self.rows.insert(key, entity);
            }
            Pending::Update(entity) => {
                let key = entity.key().ok_or(StoreError::UnassignedKey(entity_name))?;
                if !self.rows.contains_key(&key) {
                    return Err(StoreError::RowNotFound {
                        entity: entity_name,
                        key: E::display_key(&key),
                    });
                }
                self.rows.insert(key, entity);
            }
            Pending::Patch { stub, fields } => {
                let key = stub.key().ok_or(StoreError::UnassignedKey(entity_name))?;
                let row = self.rows.get_mut(&key).ok_or_else(|| StoreError::RowNotFound {
                    entity: entity_name,
                    key: E::display_key(&key),
                })?;
                for field in &fields {
                    row.set_field(field, stub.field(field));
                }
            }
            Pending::Delete(key) => {
                // Deleting an absent row is a no-op.
                self.rows.remove(&key);
            }
        }
        Ok(())
    }
}

/// Object-safe view of a table, for the operations that fan out over every
/// entity type at once (flush, snapshots, detach).
trait AnyTable: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn begin_snapshot(&mut self);
    fn commit_snapshot(&mut self);
    fn rollback_snapshot(&mut self);
    fn clear_pending(&mut self);
    fn flush(&mut self) -> Result<(), StoreError>;
}

impl<E: Entity> AnyTable for Table<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn begin_snapshot(&mut self) {
        self.snapshot = Some(self.rows.clone());
    }

    fn commit_snapshot(&mut self) {
        self.snapshot = None;
    }

    fn rollback_snapshot(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.rows = snapshot;
        }
    }

    fn clear_pending(&mut self) {
        self.pending.clear();
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        for op in std::mem::take(&mut self.pending) {
            self.apply(op)?;
        }
        Ok(())
    }
}

struct Shared {
    tables: RwLock<HashMap<TypeId, Box<dyn AnyTable>>>,
    in_transaction: AtomicBool,
    transactions_begun: AtomicU64,
    commits: AtomicU64,
}

/// The concrete in-memory persistence context.
pub struct MemoryContext {
    name: String,
    transactional: bool,
    shared: Arc<Shared>,
}

impl MemoryContext {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::build(name.into(), true)
    }

    /// A context that refuses transactions. The unit of work still flushes it
    /// alongside the transactional contexts.
    pub fn non_transactional(name: impl Into<String>) -> Arc<Self> {
        Self::build(name.into(), false)
    }

    fn build(name: String, transactional: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            transactional,
            shared: Arc::new(Shared {
                tables: RwLock::new(HashMap::new()),
                in_transaction: AtomicBool::new(false),
                transactions_begun: AtomicU64::new(0),
                commits: AtomicU64::new(0),
            }),
        })
    }

    fn with_table<E: Entity, R>(&self, f: impl FnOnce(&mut Table<E>) -> R) -> R {
        let mut tables = self.shared.tables.write().expect("table map poisoned");
        let table = tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                let mut table = Table::<E>::new();
                // A table created mid-transaction must roll back to empty.
                if self.shared.in_transaction.load(Ordering::SeqCst) {
                    table.begin_snapshot();
                }
                Box::new(table)
            })
            .as_any_mut()
            .downcast_mut::<Table<E>>()
            .expect("table type mismatch");
        f(table)
    }

    /// Clones the committed rows of one entity table. Queries always run over
    /// the flushed state, so work flushed inside an open transaction is
    /// visible to reads on the same context.
    pub fn snapshot_rows<E: Entity>(&self) -> Vec<E> {
        self.with_table(|t: &mut Table<E>| t.rows.values().cloned().collect())
    }

    pub fn find<E: Entity>(&self, key: &E::Key) -> Option<E> {
        self.with_table(|t: &mut Table<E>| t.rows.get(key).cloned())
    }

    /// Tracks an insert. Entities without a key get one from
    /// [`Entity::generate_key`]; the assigned key is returned so callers can
    /// address the row before the flush lands it.
    pub fn add<E: Entity>(&self, mut entity: E) -> Result<E::Key, AppError> {
        let key = match entity.key() {
            Some(key) => key,
            None => {
                let key = E::generate_key()
                    .ok_or(AppError::MissingKey(E::static_schema().entity))?;
                entity.set_key(key.clone());
                key
            }
        };
        self.with_table(|t: &mut Table<E>| t.pending.push(Pending::Add(entity)));
        Ok(key)
    }

    /// Tracks a full-row update.
    pub fn attach_update<E: Entity>(&self, entity: E) -> Result<(), AppError> {
        if entity.key().is_none() {
            return Err(AppError::MissingKey(E::static_schema().entity));
        }
        self.with_table(|t: &mut Table<E>| t.pending.push(Pending::Update(entity)));
        Ok(())
    }

    /// Tracks a sparse update: only the named fields of the stub are applied
    /// to the stored row at flush time.
    pub fn attach_patch<E: Entity>(&self, stub: E, fields: Vec<String>) -> Result<(), AppError> {
        if stub.key().is_none() {
            return Err(AppError::MissingKey(E::static_schema().entity));
        }
        self.with_table(|t: &mut Table<E>| t.pending.push(Pending::Patch { stub, fields }));
        Ok(())
    }

    pub fn mark_deleted<E: Entity>(&self, key: E::Key) {
        self.with_table(|t: &mut Table<E>| t.pending.push(Pending::Delete(key)));
    }

    pub fn transactions_begun(&self) -> u64 {
        self.shared.transactions_begun.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u64 {
        self.shared.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataContext for MemoryContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_transactions(&self) -> bool {
        self.transactional
    }

    fn in_transaction(&self) -> bool {
        self.shared.in_transaction.load(Ordering::SeqCst)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut tables = self.shared.tables.write().expect("table map poisoned");
        for table in tables.values_mut() {
            table.flush()?;
        }
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn ContextTransaction>, StoreError> {
        if !self.transactional {
            return Err(StoreError::TransactionsUnsupported(self.name.clone()));
        }
        if self
            .shared
            .in_transaction
            .swap(true, Ordering::SeqCst)
        {
            return Err(StoreError::TransactionActive(self.name.clone()));
        }

        {
            let mut tables = self.shared.tables.write().expect("table map poisoned");
            for table in tables.values_mut() {
                table.begin_snapshot();
            }
        }
        self.shared.transactions_begun.fetch_add(1, Ordering::SeqCst);
        debug!(context = %self.name, "transaction begun");

        Ok(Box::new(MemoryTransaction {
            context: self.name.clone(),
            shared: Arc::clone(&self.shared),
            finished: false,
        }))
    }

    fn detach_pending(&self) {
        let mut tables = self.shared.tables.write().expect("table map poisoned");
        for table in tables.values_mut() {
            table.clear_pending();
        }
    }
}

struct MemoryTransaction {
    context: String,
    shared: Arc<Shared>,
    finished: bool,
}

impl MemoryTransaction {
    fn finish(&mut self, commit: bool) {
        if self.finished {
            return;
        }
        self.finished = true;

        let mut tables = self.shared.tables.write().expect("table map poisoned");
        for table in tables.values_mut() {
            if commit {
                table.commit_snapshot();
            } else {
                table.rollback_snapshot();
            }
        }
        self.shared.in_transaction.store(false, Ordering::SeqCst);
        if commit {
            self.shared.commits.fetch_add(1, Ordering::SeqCst);
        }
        debug!(
            context = %self.context,
            outcome = if commit { "commit" } else { "rollback" },
            "transaction finished"
        );
    }
}

#[async_trait]
impl ContextTransaction for MemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.finish(true);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.finish(false);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        // An abandoned transaction rolls back.
        self.finish(false);
    }
}
