//! Mutating repository surface: tracked loads, inserts, full and sparse
//! updates, deletes, and the flush policy.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::config::{RepositoryOptions, SaveChangesStrategy};
use crate::entity::Patch;
use crate::error::AppError;
use crate::paths::IncludeSpec;
use crate::query::Predicate;
use crate::repository::{ListQuery, MergeOptions, QueryRepository};
use crate::store::{DataContext, Loadable, MemoryContext};

/// Read/write repository over one entity type.
///
/// Extends [`QueryRepository`] (available through deref) with mutations.
/// Whether a mutation flushes immediately is decided by the configured
/// [`SaveChangesStrategy`]; an open transaction on the context defers
/// `PerUnitOfWork` flushes to the surrounding scope.
pub struct Repository<E: Loadable> {
    queries: QueryRepository<E>,
}

impl<E: Loadable> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            queries: self.queries.clone(),
        }
    }
}

impl<E: Loadable> Deref for Repository<E> {
    type Target = QueryRepository<E>;

    fn deref(&self) -> &QueryRepository<E> {
        &self.queries
    }
}

impl<E: Loadable> Repository<E> {
    pub fn new(ctx: Arc<MemoryContext>, options: RepositoryOptions) -> Self {
        Self {
            queries: QueryRepository::new(ctx, options),
        }
    }

    /// Loads an entity for mutation. Includes are resolved in mutation mode,
    /// so query-only navigations stay unloaded.
    pub async fn get_for_update(
        &self,
        key: &E::Key,
        includes: Option<&IncludeSpec>,
    ) -> Result<Option<E>, AppError> {
        let mut found = self.get(key).await?;
        if let (Some(row), Some(includes)) = (found.as_mut(), includes) {
            self.apply_includes(std::slice::from_mut(row), includes, false);
        }
        Ok(found)
    }

    pub async fn get_list_for_update(&self, mut query: ListQuery<E>) -> Result<Vec<E>, AppError> {
        let includes = query.includes.take();
        let mut rows = self.get_list(query).await?;
        if let Some(includes) = &includes {
            self.apply_includes(&mut rows, includes, false);
        }
        Ok(rows)
    }

    /// Inserts an entity, generating a key when none is assigned.
    ///
    /// A generated key is only durable once the row is flushed, so inserts of
    /// keyless entities flush immediately regardless of strategy; the caller
    /// gets back an entity it can re-query within the same scope.
    pub async fn insert(&self, mut entity: E) -> Result<E, AppError> {
        let generated = entity.key().is_none();
        let key = self.context().add(entity.clone())?;
        entity.set_key(key.clone());

        if generated {
            self.context().flush().await?;
            debug!(
                entity = E::static_schema().entity,
                key = %E::display_key(&key),
                "inserted with generated key"
            );
        } else {
            self.save_changes().await?;
        }
        Ok(entity)
    }

    /// Replaces the stored row with the given entity.
    pub async fn update(&self, entity: E) -> Result<(), AppError> {
        self.context().attach_update(entity)?;
        self.save_changes().await
    }

    /// Sparse update: applies only the patch fields that match scalar,
    /// non-key schema fields.
    ///
    /// Unmatched patch fields are dropped; a patch with zero surviving fields
    /// tracks nothing but still flushes per policy, so the call observes the
    /// same write-through behavior as any other mutation. A value of the
    /// wrong kind for a matched field is a caller bug and fails the call.
    pub async fn patch(&self, key: &E::Key, patch: Patch) -> Result<(), AppError> {
        let schema = E::static_schema();
        if schema.primary_key.is_empty() {
            return Err(AppError::NoPrimaryKey(schema.entity));
        }

        let mut stub = E::default();
        stub.set_key(key.clone());
        let mut fields = Vec::new();

        for (name, value) in patch.iter() {
            let Some(field) = schema.field(name) else {
                continue;
            };
            if schema.is_key_field(field.name) {
                continue;
            }
            if !stub.set_field(field.name, value.clone()) {
                return Err(AppError::InvalidFieldValue {
                    entity: schema.entity,
                    field: field.name.to_string(),
                });
            }
            fields.push(field.name.to_string());
        }

        if !fields.is_empty() {
            self.context().attach_patch(stub, fields)?;
        }
        self.save_changes().await
    }

    /// Merge (upsert): matches each incoming entity against stored rows on
    /// the merge-by field values; matches become sparse updates of the
    /// selected fields, the rest are inserted.
    ///
    /// Misconfigured options — a merge-by property that does not resolve to
    /// exactly one field, or include and exclude lists set together — fail
    /// before anything is tracked.
    pub async fn merge(&self, entities: Vec<E>, options: &MergeOptions) -> Result<(), AppError> {
        let plan = options.resolve(E::static_schema())?;
        let rows = self.context().snapshot_rows::<E>();

        for entity in entities {
            let matched = rows.iter().find(|row| {
                plan.merge_by
                    .iter()
                    .all(|name| row.field(name) == entity.field(name))
            });
            match matched.and_then(|row| row.key()) {
                Some(key) => {
                    let mut stub = E::default();
                    stub.set_key(key);
                    let mut fields = Vec::new();
                    for name in &plan.write_fields {
                        if stub.set_field(name, entity.field(name)) {
                            fields.push((*name).to_string());
                        }
                    }
                    if !fields.is_empty() {
                        self.context().attach_patch(stub, fields)?;
                    }
                }
                None => {
                    self.context().add(entity)?;
                }
            }
        }
        self.save_changes().await
    }

    /// Loads, mutates and re-stores an entity. An absent row is not an
    /// error; the caller gets `Ok(None)` and nothing is tracked.
    pub async fn update_with<F, Fut>(&self, key: &E::Key, mutate: F) -> Result<Option<E>, AppError>
    where
        F: FnOnce(E) -> Fut,
        Fut: Future<Output = E>,
    {
        let Some(row) = self.context().find::<E>(key) else {
            return Ok(None);
        };
        let mut updated = mutate(row).await;
        // The mutator cannot move the row to a different identity.
        updated.set_key(key.clone());
        self.context().attach_update(updated.clone())?;
        self.save_changes().await?;
        Ok(Some(updated))
    }

    /// Deletes the entity's row. Entities without a key, and keys without a
    /// row, delete nothing.
    pub async fn delete(&self, entity: &E) -> Result<(), AppError> {
        match entity.key() {
            Some(key) => self.delete_by_key(&key).await,
            None => Ok(()),
        }
    }

    pub async fn delete_by_key(&self, key: &E::Key) -> Result<(), AppError> {
        self.context().mark_deleted::<E>(key.clone());
        self.save_changes().await
    }

    /// Deletes every row matching the predicate.
    pub async fn delete_where(&self, filter: &Predicate<E>) -> Result<(), AppError> {
        let doomed: Vec<E::Key> = self
            .context()
            .snapshot_rows::<E>()
            .iter()
            .filter(|e| filter.matches(e))
            .filter_map(|e| e.key())
            .collect();
        for key in doomed {
            self.context().mark_deleted::<E>(key);
        }
        self.save_changes().await
    }

    async fn save_changes(&self) -> Result<(), AppError> {
        match self.options().save_changes {
            SaveChangesStrategy::PerOperation => self.context().flush().await?,
            SaveChangesStrategy::PerUnitOfWork => {
                // Inside a transaction the surrounding scope owns the flush.
                if !self.context().in_transaction() {
                    self.context().flush().await?;
                }
            }
        }
        Ok(())
    }
}
