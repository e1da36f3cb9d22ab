//! Integration tests for scope flattening, commit and rollback behavior.

use std::sync::Arc;

use stratum::config::RepositoryOptions;
use stratum::entity::Patch;
use stratum::error::{AppError, StoreError};
use stratum::models::Image;
use stratum::repository::Repository;
use stratum::store::{DataContext, MemoryContext};
use stratum::uow::UnitOfWork;

fn image(name: &str, size: i64) -> Image {
    Image {
        name: name.into(),
        size,
        ..Image::default()
    }
}

/// Repository with the deferred (per-unit-of-work) flush strategy.
fn deferred_repository(ctx: &Arc<MemoryContext>) -> Repository<Image> {
    Repository::new(Arc::clone(ctx), RepositoryOptions::default())
}

fn unit_of_work(ctx: &Arc<MemoryContext>) -> UnitOfWork {
    UnitOfWork::new(vec![Arc::clone(ctx) as Arc<dyn DataContext>])
}

#[tokio::test]
async fn test_nested_scopes_flatten_into_one_transaction() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);

    let outer = uow.begin_scope().await.unwrap();
    let inner = uow.begin_scope().await.unwrap();
    assert_eq!(ctx.transactions_begun(), 1);

    // Completing the inner handle is a no-op; the outer decides.
    inner.complete().await.unwrap();
    assert!(!outer.is_completed());
    inner.dispose().await;

    outer.complete().await.unwrap();
    outer.dispose().await;

    assert_eq!(ctx.transactions_begun(), 1);
    assert_eq!(ctx.commits(), 1);
    assert!(!ctx.in_transaction());
}

#[tokio::test]
async fn test_abandoned_scope_rolls_back_and_detaches() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);
    let repo = deferred_repository(&ctx);

    let scope = uow.begin_scope().await.unwrap();

    // Generated-key insert flushes inside the transaction...
    let flushed = repo.insert(image("flushed.png", 1)).await.unwrap();
    assert!(repo.get(&flushed.id).await.unwrap().is_some());

    // ...while the patch stays pending (deferred strategy).
    repo.patch(&flushed.id, Patch::new().set("size", 99i64))
        .await
        .unwrap();

    scope.dispose().await;

    // Rollback removed the flushed row; detach dropped the pending patch.
    assert!(repo.get(&flushed.id).await.unwrap().is_none());
    ctx.flush().await.unwrap();
    assert!(repo.get(&flushed.id).await.unwrap().is_none());
    assert_eq!(ctx.commits(), 0);
}

#[tokio::test]
async fn test_raw_dropped_scope_discards_tracked_changes() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);
    let repo = deferred_repository(&ctx);

    let scope = uow.begin_scope().await.unwrap();
    let mut orphan = image("orphan.png", 1);
    orphan.id = "orphan".into();
    repo.insert(orphan).await.unwrap();

    // Dropping the handle without dispose (the unwind path) abandons the
    // scope; its tracked work must not ride along with the next commit.
    drop(scope);

    let next = uow.begin_scope().await.unwrap();
    next.complete().await.unwrap();
    next.dispose().await;

    assert!(repo.get(&"orphan".to_string()).await.unwrap().is_none());
    assert_eq!(ctx.commits(), 1);
}

#[tokio::test]
async fn test_complete_is_idempotent() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);

    let scope = uow.begin_scope().await.unwrap();
    scope.complete().await.unwrap();
    scope.complete().await.unwrap();
    scope.dispose().await;

    assert_eq!(ctx.commits(), 1);
}

#[tokio::test]
async fn test_scope_commits_deferred_work() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);
    let repo = deferred_repository(&ctx);

    let scope = uow.begin_scope().await.unwrap();
    let inserted = repo.insert(image("a.png", 10)).await.unwrap();
    repo.patch(&inserted.id, Patch::new().set("alt_text", "patched"))
        .await
        .unwrap();

    // Pending patch is not applied until the scope completes.
    assert_eq!(repo.get(&inserted.id).await.unwrap().unwrap().alt_text, "");

    scope.complete().await.unwrap();
    scope.dispose().await;

    let committed = repo.get(&inserted.id).await.unwrap().unwrap();
    assert_eq!(committed.alt_text, "patched");
    assert_eq!(ctx.commits(), 1);
}

#[tokio::test]
async fn test_failed_completion_leaves_scope_recoverable_by_dispose() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);
    let repo = deferred_repository(&ctx);

    let scope = uow.begin_scope().await.unwrap();
    // Deferred update of a row that does not exist fails at flush time.
    let mut ghost = image("ghost.png", 1);
    ghost.id = "ghost".into();
    repo.update(ghost).await.unwrap();

    assert!(matches!(
        scope.complete().await,
        Err(AppError::Store(StoreError::RowNotFound { .. }))
    ));
    scope.dispose().await;

    assert!(!ctx.in_transaction());
    assert_eq!(ctx.commits(), 0);

    // The unit of work is usable again after the failed scope.
    let scope = uow.begin_scope().await.unwrap();
    scope.complete().await.unwrap();
    scope.dispose().await;
    assert_eq!(ctx.commits(), 1);
}

#[tokio::test]
async fn test_execute_commits_on_success_and_rolls_back_on_error() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);
    let repo = deferred_repository(&ctx);

    let committed = repo.clone();
    let inserted = uow
        .execute(|| async move { committed.insert(image("kept.png", 1)).await })
        .await
        .unwrap();
    assert!(repo.get(&inserted.id).await.unwrap().is_some());

    let aborted = repo.clone();
    let failed: Result<Image, AppError> = uow
        .execute(|| async move {
            let _ = aborted.insert(image("doomed.png", 1)).await?;
            Err(AppError::ImageNotFound("forced failure".into()))
        })
        .await;
    assert!(failed.is_err());

    assert_eq!(repo.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_fan_out_over_mixed_contexts() {
    let main = MemoryContext::new("main");
    let logs = MemoryContext::non_transactional("logs");
    let uow = UnitOfWork::new(vec![
        Arc::clone(&main) as Arc<dyn DataContext>,
        Arc::clone(&logs) as Arc<dyn DataContext>,
    ]);
    let main_repo = deferred_repository(&main);
    let log_repo = deferred_repository(&logs);

    let scope = uow.begin_scope().await.unwrap();
    // Only the transaction-capable context gets a transaction.
    assert_eq!(main.transactions_begun(), 1);
    assert_eq!(logs.transactions_begun(), 0);
    assert!(!logs.in_transaction());

    let tracked = main_repo.insert(image("tracked.png", 1)).await.unwrap();
    let logged = log_repo.insert(image("logged.png", 1)).await.unwrap();

    scope.complete().await.unwrap();
    scope.dispose().await;

    assert!(main_repo.get(&tracked.id).await.unwrap().is_some());
    assert!(log_repo.get(&logged.id).await.unwrap().is_some());
    assert_eq!(main.commits(), 1);
    assert_eq!(logs.commits(), 0);
}

#[tokio::test]
async fn test_new_scope_replaces_completed_scope() {
    let ctx = MemoryContext::new("main");
    let uow = unit_of_work(&ctx);

    let first = uow.begin_scope().await.unwrap();
    first.complete().await.unwrap();

    // The completed scope is not joined; a fresh one opens a new transaction.
    let second = uow.begin_scope().await.unwrap();
    assert_eq!(ctx.transactions_begun(), 2);

    second.complete().await.unwrap();
    second.dispose().await;
    first.dispose().await;
    assert_eq!(ctx.commits(), 2);
}
