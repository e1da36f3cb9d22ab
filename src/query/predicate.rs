//! Caller-supplied filters over typed entities.

use std::sync::Arc;

/// A reusable, cloneable filter over `E`.
///
/// Wraps the closure in an `Arc` so a predicate can be captured by query
/// builders and handed across await points without re-borrowing the caller.
pub struct Predicate<E> {
    test: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> Predicate<E> {
    pub fn new(test: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            test: Arc::new(test),
        }
    }

    /// Matches every entity.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn matches(&self, entity: &E) -> bool {
        (self.test)(entity)
    }

    /// Both predicates must match.
    pub fn and(self, other: Predicate<E>) -> Self
    where
        E: 'static,
    {
        Self::new(move |e| self.matches(e) && other.matches(e))
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<E> std::fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_composes() {
        let even = Predicate::new(|n: &i64| n % 2 == 0);
        let small = Predicate::new(|n: &i64| *n < 10);
        let both = even.and(small);

        assert!(both.matches(&4));
        assert!(!both.matches(&5));
        assert!(!both.matches(&12));
    }

    #[test]
    fn test_always() {
        assert!(Predicate::<i64>::always().matches(&-1));
    }
}
