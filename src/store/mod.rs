//! Storage engine layer: the context/transaction traits the unit of work
//! drives, and the in-memory engine implementing them.

mod memory;
mod traits;

pub use memory::MemoryContext;
pub use traits::{ContextTransaction, DataContext};

use crate::entity::Entity;

/// Entities that can populate their declared navigations from the engine.
///
/// `path` is a canonical include path relative to the entity (for example
/// `images` or `images.tags`); implementations load the head navigation and
/// recurse into the loaded values for the remaining segments. The default
/// implementation suits entities without navigations.
pub trait Loadable: Entity {
    fn load_path(&mut self, path: &str, ctx: &MemoryContext) {
        let _ = (path, ctx);
    }
}

/// Splits an include path into its head navigation and the remainder.
pub(crate) fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::error::StoreError;
    use crate::models::Image;

    fn image(name: &str) -> Image {
        Image {
            name: name.into(),
            ..Image::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_generated_key_and_flush_lands_row() {
        let ctx = MemoryContext::new("test");
        let key = ctx.add(image("a.png")).unwrap();
        // tracked but not yet flushed
        assert!(ctx.find::<Image>(&key).is_none());

        ctx.flush().await.unwrap();
        assert_eq!(ctx.find::<Image>(&key).unwrap().name, "a.png");
    }

    #[tokio::test]
    async fn test_duplicate_insert_key_fails_at_flush() {
        let ctx = MemoryContext::new("test");
        let mut first = image("a.png");
        first.set_key("fixed".to_string());
        let mut second = image("b.png");
        second.set_key("fixed".to_string());

        ctx.add(first).unwrap();
        ctx.flush().await.unwrap();
        ctx.add(second).unwrap();

        assert!(matches!(
            ctx.flush().await,
            Err(StoreError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_patch_on_missing_row_fails_at_flush() {
        let ctx = MemoryContext::new("test");
        let mut stub = Image::default();
        stub.set_key("ghost".to_string());
        stub.name = "new".into();
        ctx.attach_patch(stub, vec!["name".into()]).unwrap();

        assert!(matches!(
            ctx.flush().await,
            Err(StoreError::RowNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let ctx = MemoryContext::new("test");
        let before = ctx.add(image("kept.png")).unwrap();
        ctx.flush().await.unwrap();

        let txn = ctx.begin_transaction().await.unwrap();
        let inside = ctx.add(image("discarded.png")).unwrap();
        ctx.flush().await.unwrap();
        assert!(ctx.find::<Image>(&inside).is_some());

        txn.rollback().await.unwrap();
        assert!(ctx.find::<Image>(&inside).is_none());
        assert!(ctx.find::<Image>(&before).is_some());
        assert!(!ctx.in_transaction());
    }

    #[tokio::test]
    async fn test_second_transaction_on_open_context_is_rejected() {
        let ctx = MemoryContext::new("test");
        let _txn = ctx.begin_transaction().await.unwrap();
        assert!(matches!(
            ctx.begin_transaction().await,
            Err(StoreError::TransactionActive(_))
        ));
    }

    #[tokio::test]
    async fn test_non_transactional_context_refuses_transactions() {
        let ctx = MemoryContext::non_transactional("logs");
        assert!(!ctx.supports_transactions());
        assert!(matches!(
            ctx.begin_transaction().await,
            Err(StoreError::TransactionsUnsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_detach_pending_discards_tracked_changes() {
        let ctx = MemoryContext::new("test");
        let key = ctx.add(image("never.png")).unwrap();
        ctx.detach_pending();
        ctx.flush().await.unwrap();
        assert!(ctx.find::<Image>(&key).is_none());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let ctx = MemoryContext::new("test");
        let key = {
            let _txn = ctx.begin_transaction().await.unwrap();
            let key = ctx.add(image("gone.png")).unwrap();
            ctx.flush().await.unwrap();
            key
            // txn dropped without commit
        };
        assert!(ctx.find::<Image>(&key).is_none());
        assert!(!ctx.in_transaction());
    }
}
