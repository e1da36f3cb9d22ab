//! Compiled property-path accessors with process-lifetime caching.
//!
//! A property path is a dot-separated string such as `"album.title"` naming a
//! (possibly navigational) field on an entity type. Compiling a path walks the
//! static schema once and produces a reusable accessor closure; the result -
//! including a failed resolution - is cached forever per (entity, path), since
//! the schema walk is the reflection-equivalent work worth memoizing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::entity::{FieldDef, Reflect, Schema, Value};

/// A successfully compiled property path.
pub struct ResolvedPath {
    /// Canonical dot-path using declared field casing.
    pub canonical: String,
    /// The scalar field the path terminates in.
    pub leaf: &'static FieldDef,
    accessor: Arc<dyn Fn(&dyn Reflect) -> Value + Send + Sync>,
}

impl ResolvedPath {
    /// Reads the path's value from an entity. Navigations that are not loaded
    /// read as [`Value::Null`].
    pub fn get(&self, entity: &dyn Reflect) -> Value {
        (self.accessor)(entity)
    }
}

impl std::fmt::Debug for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPath")
            .field("canonical", &self.canonical)
            .finish()
    }
}

type PathCache = HashMap<(&'static str, String), Option<Arc<ResolvedPath>>>;

// Append-only; computing the same entry twice concurrently is harmless.
static CACHE: Lazy<RwLock<PathCache>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Resolves a property path against an entity schema.
///
/// Segment lookup is case-insensitive. Interior segments must name single-
/// entity navigations; the final segment must name a scalar field. Returns
/// `None` when any segment does not exist, in which case callers substitute
/// their default behavior (constant ordering, dropped include) instead of
/// failing the query.
pub fn resolve(schema: &'static Schema, path: &str) -> Option<Arc<ResolvedPath>> {
    let key = (schema.entity, path.trim().to_ascii_lowercase());

    if let Some(cached) = CACHE.read().expect("path cache poisoned").get(&key) {
        return cached.clone();
    }

    let resolved = compile(schema, path).map(Arc::new);
    CACHE
        .write()
        .expect("path cache poisoned")
        .insert(key, resolved.clone());
    resolved
}

fn compile(schema: &'static Schema, path: &str) -> Option<ResolvedPath> {
    let segments: Vec<&str> = path.trim().split('.').collect();
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let mut current = schema;
    let mut canonical: Vec<&'static str> = Vec::with_capacity(segments.len());

    for segment in &segments[..segments.len() - 1] {
        let nav = current.navigation(segment)?;
        if nav.collection {
            // A scalar cannot be read through a collection.
            return None;
        }
        canonical.push(nav.name);
        current = (nav.target)();
    }

    let leaf = current.field(segments[segments.len() - 1])?;
    canonical.push(leaf.name);

    let walk = canonical.clone();
    let accessor: Arc<dyn Fn(&dyn Reflect) -> Value + Send + Sync> =
        Arc::new(move |root: &dyn Reflect| {
            let mut cursor: &dyn Reflect = root;
            for nav in &walk[..walk.len() - 1] {
                match cursor.related(nav) {
                    Some(next) => cursor = next,
                    None => return Value::Null,
                }
            }
            cursor.field(walk[walk.len() - 1])
        });

    Some(ResolvedPath {
        canonical: canonical.join("."),
        leaf,
        accessor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::models::{Album, Image};

    #[test]
    fn test_resolves_scalar_field_case_insensitively() {
        let schema = Image::static_schema();
        let resolved = resolve(schema, "Name").expect("should resolve");
        assert_eq!(resolved.canonical, "name");

        let mut image = Image::default();
        image.name = "cover.png".into();
        assert_eq!(resolved.get(&image), Value::Text("cover.png".into()));
    }

    #[test]
    fn test_resolves_nested_navigation_path() {
        let schema = Image::static_schema();
        let resolved = resolve(schema, "album.Title").expect("should resolve");
        assert_eq!(resolved.canonical, "album.title");

        let mut image = Image::default();
        assert_eq!(resolved.get(&image), Value::Null);

        let mut album = Album::default();
        album.title = "Holiday".into();
        image.album = Some(Box::new(album));
        assert_eq!(resolved.get(&image), Value::Text("Holiday".into()));
    }

    #[test]
    fn test_unknown_segment_is_none_and_cached() {
        let schema = Image::static_schema();
        assert!(resolve(schema, "nope").is_none());
        // second call is served from cache
        assert!(resolve(schema, "nope").is_none());
        assert!(resolve(schema, "album.nope").is_none());
    }

    #[test]
    fn test_collection_navigation_is_not_walkable() {
        let schema = Album::static_schema();
        assert!(resolve(schema, "images.name").is_none());
    }
}
