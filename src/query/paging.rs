//! Paged result envelopes.

use serde::Serialize;

/// One page of results together with the total count of the unpaged set.
///
/// `page_index` is zero-based. `total_count` reflects the filtered set before
/// the page window was applied, so callers can render pagers without a second
/// count query.
#[derive(Debug, Clone, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_index: usize,
    pub page_size: usize,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, total_count: i64, page_index: usize, page_size: usize) -> Self {
        Self {
            items,
            total_count,
            page_index,
            page_size,
        }
    }

    pub fn empty(page_index: usize, page_size: usize) -> Self {
        Self::new(Vec::new(), 0, page_index, page_size)
    }

    /// Number of pages needed to hold `total_count` items.
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        (self.total_count.max(0) as usize).div_ceil(self.page_size)
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index + 1 < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PagedList::new(vec![1, 2, 3], 7, 0, 3);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next_page());
        assert!(!page.has_previous_page());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = PagedList::new(vec![7], 7, 2, 3);
        assert!(!page.has_next_page());
        assert!(page.has_previous_page());
    }

    #[test]
    fn test_empty() {
        let page = PagedList::<i64>::empty(0, 20);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next_page());
    }
}
