//! Scope lifecycle: completion, disposal, rollback-on-abandon.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, UnitOfWorkError};
use crate::store::{ContextTransaction, DataContext};

/// Shared state of one logical scope. Every nested `begin_scope` handle
/// points at the same core; `depth` counts the open handles.
pub(crate) struct ScopeCore {
    pub(crate) contexts: Vec<Arc<dyn DataContext>>,
    pub(crate) depth: AtomicUsize,
    pub(crate) completed: AtomicBool,
    pub(crate) rolled_back: AtomicBool,
    /// Open transactions, one per transaction-capable context. Drained on
    /// commit or rollback.
    pub(crate) transactions: Mutex<Vec<Box<dyn ContextTransaction>>>,
}

impl ScopeCore {
    pub(crate) fn is_live(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
            && !self.completed.load(Ordering::SeqCst)
            && !self.rolled_back.load(Ordering::SeqCst)
    }
}

/// A handle on the current unit-of-work scope.
///
/// Nested handles flatten into the outermost scope: only the handle that
/// brings the depth back to zero decides the outcome. A handle disposed
/// without completion rolls the whole scope back; prefer
/// [`UnitOfWork::execute`](crate::uow::UnitOfWork::execute), which pairs the
/// two correctly.
pub struct UnitOfWorkScope {
    core: Arc<ScopeCore>,
    disposed: bool,
}

impl UnitOfWorkScope {
    pub(crate) fn new(core: Arc<ScopeCore>) -> Self {
        Self {
            core,
            disposed: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.core.completed.load(Ordering::SeqCst)
    }

    pub fn is_rolled_back(&self) -> bool {
        self.core.rolled_back.load(Ordering::SeqCst)
    }

    /// Marks the scope's work as successful.
    ///
    /// Only the outermost handle (depth 1) actually flushes and commits;
    /// completing an inner handle is a no-op so nested call sites compose.
    /// Completing twice is a no-op too. Completing after a rollback is a
    /// caller bug and fails.
    pub async fn complete(&self) -> Result<(), AppError> {
        if self.core.rolled_back.load(Ordering::SeqCst) {
            return Err(UnitOfWorkError::RolledBack.into());
        }
        if self.core.completed.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.core.depth.load(Ordering::SeqCst) > 1 {
            return Ok(());
        }

        for ctx in &self.core.contexts {
            ctx.flush().await?;
        }
        for txn in self.core.transactions.lock().await.drain(..) {
            txn.commit().await?;
        }
        self.core.completed.store(true, Ordering::SeqCst);
        debug!("unit of work committed");
        Ok(())
    }

    /// Releases this handle. When the last handle goes and the scope was
    /// never completed, all pending changes are detached and every open
    /// transaction rolls back. Disposal never fails; rollback problems are
    /// logged, not raised.
    pub async fn dispose(mut self) {
        self.disposed = true;

        let previous = self.core.depth.fetch_sub(1, Ordering::SeqCst);
        if previous != 1 {
            return;
        }

        if self.core.completed.load(Ordering::SeqCst) {
            return;
        }

        self.core.rolled_back.store(true, Ordering::SeqCst);
        for ctx in &self.core.contexts {
            ctx.detach_pending();
        }
        for txn in self.core.transactions.lock().await.drain(..) {
            if let Err(error) = txn.rollback().await {
                warn!(%error, "rollback failed while abandoning scope");
            }
        }
        debug!("unit of work rolled back");
    }
}

impl Drop for UnitOfWorkScope {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        // A raw drop is the unwind path of `?` and panics; it must leave the
        // scope in the same abandoned state `dispose` would. Detaching is
        // synchronous so it can run here; the open transactions roll back
        // when the core itself goes.
        let previous = self.core.depth.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && !self.core.completed.load(Ordering::SeqCst) {
            self.core.rolled_back.store(true, Ordering::SeqCst);
            for ctx in &self.core.contexts {
                ctx.detach_pending();
            }
        }
        warn!("unit of work scope dropped without dispose");
    }
}
