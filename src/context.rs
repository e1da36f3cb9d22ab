//! Application context providing the dependency injection root.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::di::{Context as ContextDerive, FromRef};
use crate::repository::{QueryRepository, Repository};
use crate::storage::{InMemoryObjectStorage, ObjectStorage};
use crate::store::{DataContext, Loadable, MemoryContext};
use crate::uow::UnitOfWork;

/// Root application context.
///
/// Holds the shared dependencies; `#[derive(Context)]` generates a `FromRef`
/// implementation per field so services resolve their dependencies at
/// compile time. Constructing the context is the registration step: every
/// persistence context the unit of work should span is listed here.
#[derive(ContextDerive, Clone)]
pub struct AppContext {
    /// The persistence context repositories are bound to.
    pub store: Arc<MemoryContext>,
    /// Scope factory spanning every registered context.
    pub uow: Arc<UnitOfWork>,
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Blob storage backend.
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppContext {
    /// Wires the default in-memory stack from configuration.
    pub fn new(config: AppConfig) -> Self {
        let store = MemoryContext::new("main");
        let uow = Arc::new(UnitOfWork::new(vec![
            Arc::clone(&store) as Arc<dyn DataContext>
        ]));
        let storage: Arc<dyn ObjectStorage> =
            Arc::new(InMemoryObjectStorage::new(&config.storage));
        Self {
            store,
            uow,
            config: Arc::new(config),
            storage,
        }
    }
}

// Repositories are cheap handles; any entity type resolves one straight from
// the context.
impl<E: Loadable> FromRef<AppContext> for Repository<E> {
    fn from_ref(ctx: &AppContext) -> Self {
        Repository::new(Arc::clone(&ctx.store), ctx.config.repository)
    }
}

impl<E: Loadable> FromRef<AppContext> for QueryRepository<E> {
    fn from_ref(ctx: &AppContext) -> Self {
        QueryRepository::new(Arc::clone(&ctx.store), ctx.config.repository)
    }
}
