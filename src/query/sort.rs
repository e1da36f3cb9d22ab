//! Dynamic sort specifications applied through resolved property paths.

use crate::entity::{Entity, Schema};
use crate::error::AppError;
use crate::paths::{resolve, ResolvedPath};

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One (path, direction) pair of a sort specification.
#[derive(Debug, Clone)]
pub struct SortItem {
    pub sort_by: String,
    pub direction: SortDirection,
}

impl SortItem {
    pub fn asc(sort_by: impl Into<String>) -> Self {
        Self {
            sort_by: sort_by.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(sort_by: impl Into<String>) -> Self {
        Self {
            sort_by: sort_by.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// An ordered list of sort items. Chained items behave like
/// orderBy/thenBy: earlier items win, later items break ties.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    pub items: Vec<SortItem>,
}

impl SortSpec {
    pub fn new(items: Vec<SortItem>) -> Self {
        Self { items }
    }

    pub fn by(item: SortItem) -> Self {
        Self { items: vec![item] }
    }

    pub fn then(mut self, item: SortItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The default specification: the entity's primary-key fields ascending.
    /// Deterministic pagination needs a tie-break, so a missing primary key is
    /// a fatal configuration error rather than a silent fallback.
    pub fn primary_key(schema: &'static Schema) -> Result<Self, AppError> {
        if schema.primary_key.is_empty() {
            return Err(AppError::NoPrimaryKey(schema.entity));
        }
        Ok(Self {
            items: schema.primary_key.iter().map(|f| SortItem::asc(*f)).collect(),
        })
    }
}

/// Sorts entities in place by the given specification.
///
/// Each sort path is resolved against the entity schema; items whose path
/// does not resolve are skipped, so an entirely-unknown specification leaves
/// the slice in its incoming order (the constant-ordering fallback). The sort
/// is stable.
pub fn order_by<E: Entity>(items: &mut [E], spec: &SortSpec) {
    let schema = E::static_schema();
    let keys: Vec<(Arc<ResolvedPath>, SortDirection)> = spec
        .items
        .iter()
        .filter(|item| !item.sort_by.trim().is_empty())
        .filter_map(|item| resolve(schema, &item.sort_by).map(|path| (path, item.direction)))
        .collect();

    if keys.is_empty() {
        return;
    }

    items.sort_by(|a, b| {
        for (path, direction) in &keys {
            let ordering = path.get(a).total_cmp(&path.get(b));
            let ordering = match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Image;

    fn image(id: &str, name: &str, size: i64) -> Image {
        Image {
            id: id.into(),
            name: name.into(),
            size,
            ..Image::default()
        }
    }

    #[test]
    fn test_multi_key_sort_breaks_ties_with_later_items() {
        let mut images = vec![
            image("3", "b", 10),
            image("1", "a", 10),
            image("2", "a", 5),
        ];
        let spec = SortSpec::by(SortItem::asc("name")).then(SortItem::desc("size"));
        order_by(&mut images, &spec);

        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_unknown_sort_field_leaves_order_unchanged() {
        let mut images = vec![image("2", "b", 1), image("1", "a", 2)];
        order_by(&mut images, &SortSpec::by(SortItem::asc("not_a_field")));

        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_unknown_item_skipped_known_item_still_applies() {
        let mut images = vec![image("2", "b", 1), image("1", "a", 2)];
        let spec = SortSpec::by(SortItem::asc("bogus")).then(SortItem::asc("name"));
        order_by(&mut images, &spec);

        let ids: Vec<_> = images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_primary_key_spec() {
        use crate::entity::Entity;
        let spec = SortSpec::primary_key(Image::static_schema()).unwrap();
        assert_eq!(spec.items.len(), 1);
        assert_eq!(spec.items[0].sort_by, "id");
    }
}
