//! Unit of work: one transactional scope spanning every registered
//! persistence context.
//!
//! A scope opens one transaction per transaction-capable context on first
//! begin. Nested begins reuse the live scope (no new transactions, depth + 1);
//! the outermost completion flushes every context and commits every
//! transaction, and abandoning the outermost handle rolls everything back.

mod scope;

pub use scope::UnitOfWorkScope;
use scope::ScopeCore;

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::AppError;
use crate::store::DataContext;

/// Scope factory over a fixed set of persistence contexts.
pub struct UnitOfWork {
    contexts: Vec<Arc<dyn DataContext>>,
    // Guards scope creation; never held across an await.
    current: Mutex<Option<Arc<ScopeCore>>>,
}

impl UnitOfWork {
    pub fn new(contexts: Vec<Arc<dyn DataContext>>) -> Self {
        Self {
            contexts,
            current: Mutex::new(None),
        }
    }

    pub fn contexts(&self) -> &[Arc<dyn DataContext>] {
        &self.contexts
    }

    /// Opens (or joins) the current scope.
    ///
    /// When a live scope exists the new handle joins it and no transactions
    /// are opened; a completed or rolled-back scope is replaced by a fresh
    /// one. The first handle of a fresh scope opens one transaction per
    /// context that supports them.
    pub async fn begin_scope(&self) -> Result<UnitOfWorkScope, AppError> {
        let (core, fresh) = {
            let mut current = self.current.lock().expect("scope lock poisoned");
            match current.as_ref() {
                Some(core) if core.is_live() => {
                    core.depth.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        depth = core.depth.load(Ordering::SeqCst),
                        "joined unit of work scope"
                    );
                    (Arc::clone(core), false)
                }
                _ => {
                    let core = Arc::new(ScopeCore {
                        contexts: self.contexts.clone(),
                        depth: AtomicUsize::new(1),
                        completed: AtomicBool::new(false),
                        rolled_back: AtomicBool::new(false),
                        transactions: AsyncMutex::new(Vec::new()),
                    });
                    *current = Some(Arc::clone(&core));
                    (core, true)
                }
            }
        };

        if fresh {
            let mut transactions = core.transactions.lock().await;
            for ctx in &core.contexts {
                if !ctx.supports_transactions() {
                    continue;
                }
                match ctx.begin_transaction().await {
                    Ok(txn) => transactions.push(txn),
                    Err(error) => {
                        // Failed to open the scope; undo what we opened.
                        for txn in transactions.drain(..) {
                            let _ = txn.rollback().await;
                        }
                        core.rolled_back.store(true, Ordering::SeqCst);
                        core.depth.store(0, Ordering::SeqCst);
                        return Err(error.into());
                    }
                }
            }
            debug!(
                transactions = transactions.len(),
                "unit of work scope opened"
            );
        }

        Ok(UnitOfWorkScope::new(core))
    }

    /// Runs `work` inside a scope: complete on success, dispose always.
    pub async fn execute<F, Fut, T>(&self, work: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let scope = self.begin_scope().await?;
        match work().await {
            Ok(value) => {
                let completed = scope.complete().await;
                scope.dispose().await;
                completed.map(|()| value)
            }
            Err(error) => {
                scope.dispose().await;
                Err(error)
            }
        }
    }
}
