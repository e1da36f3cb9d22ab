//! Read-only repository surface: non-tracking queries with dynamic sort,
//! paging and eager-load includes.

use std::sync::Arc;

use tracing::debug;

use crate::config::RepositoryOptions;
use crate::error::AppError;
use crate::paths::{resolve_includes, IncludeSpec};
use crate::query::{order_by, PagedList, Predicate, SortSpec};
use crate::store::{Loadable, MemoryContext};

/// Declarative list query: filter, sort, window, includes.
///
/// `skip` and `take` values below 1 are ignored; an absent (or empty) sort
/// falls back to the primary key ascending so paging stays deterministic.
pub struct ListQuery<E> {
    pub filter: Option<Predicate<E>>,
    pub sort: Option<SortSpec>,
    pub skip: i64,
    pub take: i64,
    pub includes: Option<IncludeSpec>,
}

impl<E> Default for ListQuery<E> {
    fn default() -> Self {
        Self {
            filter: None,
            sort: None,
            skip: 0,
            take: 0,
            includes: None,
        }
    }
}

impl<E> ListQuery<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Predicate<E>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = take;
        self
    }

    pub fn includes(mut self, includes: IncludeSpec) -> Self {
        self.includes = Some(includes);
        self
    }
}

/// Read-only repository over one entity type, bound to a persistence context.
///
/// Every query runs against the context's flushed rows and returns detached
/// clones; nothing a query hands out is change-tracked.
pub struct QueryRepository<E: Loadable> {
    ctx: Arc<MemoryContext>,
    options: RepositoryOptions,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E: Loadable> Clone for QueryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            options: self.options,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E: Loadable> QueryRepository<E> {
    pub fn new(ctx: Arc<MemoryContext>, options: RepositoryOptions) -> Self {
        Self {
            ctx,
            options,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn context(&self) -> &Arc<MemoryContext> {
        &self.ctx
    }

    pub fn options(&self) -> RepositoryOptions {
        self.options
    }

    /// Entities whose schema declares no primary key cannot be addressed or
    /// deterministically paged; operations that need the key fail with
    /// [`AppError::NoPrimaryKey`] instead of degrading.
    fn ensure_primary_key(&self) -> Result<(), AppError> {
        if E::static_schema().primary_key.is_empty() {
            return Err(AppError::NoPrimaryKey(E::static_schema().entity));
        }
        Ok(())
    }

    pub(crate) fn apply_includes(&self, rows: &mut [E], spec: &IncludeSpec, for_querying: bool) {
        let plan = resolve_includes(
            E::static_schema(),
            spec,
            self.options.related_properties_max_depth,
            for_querying,
        );
        if plan.is_empty() {
            return;
        }
        if plan.split_query {
            debug!(entity = E::static_schema().entity, "include plan loads split");
        }
        for row in rows {
            for path in &plan.paths {
                row.load_path(path, &self.ctx);
            }
        }
    }

    pub async fn get(&self, key: &E::Key) -> Result<Option<E>, AppError> {
        self.ensure_primary_key()?;
        Ok(self.ctx.find::<E>(key))
    }

    pub async fn get_included(
        &self,
        key: &E::Key,
        includes: &IncludeSpec,
    ) -> Result<Option<E>, AppError> {
        let mut found = self.get(key).await?;
        if let Some(row) = found.as_mut() {
            self.apply_includes(std::slice::from_mut(row), includes, true);
        }
        Ok(found)
    }

    /// First entity matching the predicate, in default (primary-key) order.
    pub async fn get_by(&self, filter: &Predicate<E>) -> Result<Option<E>, AppError> {
        self.ensure_primary_key()?;
        Ok(self
            .ctx
            .snapshot_rows::<E>()
            .into_iter()
            .find(|e| filter.matches(e)))
    }

    pub async fn get_by_included(
        &self,
        filter: &Predicate<E>,
        includes: &IncludeSpec,
    ) -> Result<Option<E>, AppError> {
        let mut found = self.get_by(filter).await?;
        if let Some(row) = found.as_mut() {
            self.apply_includes(std::slice::from_mut(row), includes, true);
        }
        Ok(found)
    }

    /// Runs filter → include → sort → skip/take over the entity table.
    /// Includes load before the sort so a sort path through a navigation
    /// reads the loaded value instead of null.
    pub async fn get_list(&self, query: ListQuery<E>) -> Result<Vec<E>, AppError> {
        let mut rows = self.filtered_sorted(&query)?;

        if query.skip >= 1 {
            let skip = (query.skip as usize).min(rows.len());
            rows.drain(..skip);
        }
        if query.take >= 1 {
            rows.truncate(query.take as usize);
        }
        Ok(rows)
    }

    /// `get_list` followed by a projection, for callers that only need a
    /// derived shape.
    pub async fn get_list_projected<T>(
        &self,
        query: ListQuery<E>,
        project: impl Fn(&E) -> T,
    ) -> Result<Vec<T>, AppError> {
        Ok(self.get_list(query).await?.iter().map(project).collect())
    }

    /// One zero-based page plus the total count of the filtered (unpaged) set.
    pub async fn get_paged_list(
        &self,
        page_index: usize,
        page_size: usize,
        query: ListQuery<E>,
    ) -> Result<PagedList<E>, AppError> {
        let rows = self.filtered_sorted(&query)?;
        let total_count = rows.len() as i64;

        let items: Vec<E> = rows
            .into_iter()
            .skip(page_index.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Ok(PagedList::new(items, total_count, page_index, page_size))
    }

    pub async fn count(&self, filter: Option<&Predicate<E>>) -> Result<i64, AppError> {
        let rows = self.ctx.snapshot_rows::<E>();
        let count = match filter {
            Some(filter) => rows.iter().filter(|e| filter.matches(e)).count(),
            None => rows.len(),
        };
        Ok(count as i64)
    }

    pub async fn exists(&self, filter: &Predicate<E>) -> Result<bool, AppError> {
        Ok(self
            .ctx
            .snapshot_rows::<E>()
            .iter()
            .any(|e| filter.matches(e)))
    }

    fn filtered_sorted(&self, query: &ListQuery<E>) -> Result<Vec<E>, AppError> {
        let sort = match &query.sort {
            Some(sort) if !sort.is_empty() => sort.clone(),
            _ => SortSpec::primary_key(E::static_schema())?,
        };

        let mut rows = self.ctx.snapshot_rows::<E>();
        if let Some(filter) = &query.filter {
            rows.retain(|e| filter.matches(e));
        }
        if let Some(includes) = &query.includes {
            self.apply_includes(&mut rows, includes, true);
        }
        order_by(&mut rows, &sort);
        Ok(rows)
    }
}
