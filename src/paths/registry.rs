//! Related-property registry: declared eager-load paths per entity type.
//!
//! Built once per (entity, depth) by walking the schema's navigation
//! declarations depth-first. The walk enforces the depth limit, skips paths
//! that would reintroduce the parent type (unless the declaration waives the
//! check), and propagates split-query mode down every branch once set -
//! eager-loading several collection navigations in one joined query multiplies
//! rows, so one split include must make the whole load split.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::entity::Schema;

/// Per-path descriptor flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedPathFlags {
    pub split_query: bool,
    pub only_for_querying: bool,
}

/// Which related paths a caller wants eagerly loaded.
#[derive(Debug, Clone)]
pub enum IncludeSpec {
    /// Every declared path.
    All,
    /// A specific set of path names, matched case-insensitively.
    Paths(Vec<String>),
}

impl IncludeSpec {
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IncludeSpec::Paths(paths.into_iter().map(Into::into).collect())
    }
}

/// The usable include set for one load operation.
#[derive(Debug, Clone, Default)]
pub struct IncludePlan {
    /// Canonical paths to eager-load, in declaration order.
    pub paths: Vec<String>,
    /// Whether the load must run in split-query mode.
    pub split_query: bool,
}

impl IncludePlan {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

type RelatedPaths = Arc<BTreeMap<String, RelatedPathFlags>>;
type RegistryCache = HashMap<(&'static str, usize), RelatedPaths>;

static CACHE: Lazy<RwLock<RegistryCache>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// All declared related paths of an entity type, up to `max_depth` segments.
pub fn related_paths(schema: &'static Schema, max_depth: usize) -> RelatedPaths {
    let key = (schema.entity, max_depth);

    if let Some(cached) = CACHE.read().expect("registry cache poisoned").get(&key) {
        return Arc::clone(cached);
    }

    let mut paths = BTreeMap::new();
    fill(schema, None, false, &mut paths, None, max_depth, 0, false);
    let paths = Arc::new(paths);
    CACHE
        .write()
        .expect("registry cache poisoned")
        .insert(key, Arc::clone(&paths));
    paths
}

#[allow(clippy::too_many_arguments)]
fn fill(
    schema: &'static Schema,
    parent: Option<&'static Schema>,
    inherited_waiver: bool,
    paths: &mut BTreeMap<String, RelatedPathFlags>,
    prefix: Option<&str>,
    max_depth: usize,
    depth: usize,
    split_query: bool,
) {
    if depth > max_depth {
        return;
    }

    for nav in schema.navigations {
        let target = (nav.target)();

        if is_circular(target, parent, nav.ignore_circular_check, inherited_waiver) {
            continue;
        }

        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", nav.name),
            None => nav.name.to_string(),
        };

        // Once any ancestor on this branch is split, every descendant is.
        let split_query = split_query || nav.split_query;

        paths.insert(
            path.clone(),
            RelatedPathFlags {
                split_query,
                only_for_querying: nav.only_for_querying,
            },
        );

        fill(
            target,
            Some(schema),
            nav.ignore_circular_check,
            paths,
            Some(&path),
            max_depth,
            depth + 1,
            split_query,
        );
    }
}

fn is_circular(
    target: &'static Schema,
    parent: Option<&'static Schema>,
    waived: bool,
    inherited_waiver: bool,
) -> bool {
    !waived
        && !inherited_waiver
        && parent.is_some_and(|p| std::ptr::eq(p, target) || p.entity == target.entity)
}

/// Intersects the requested include paths with the declared ones.
///
/// Query-only paths are filtered out when `for_querying` is false (eager
/// loading them on a tracked load would create unwanted tracked state).
/// Unknown requested paths are dropped silently - includes degrade, they
/// never abort the query.
pub fn resolve_includes(
    schema: &'static Schema,
    spec: &IncludeSpec,
    max_depth: usize,
    for_querying: bool,
) -> IncludePlan {
    let declared = related_paths(schema, max_depth);
    if declared.is_empty() {
        return IncludePlan::default();
    }

    let mut plan = IncludePlan::default();
    for (path, flags) in declared.iter() {
        let requested = match spec {
            IncludeSpec::All => true,
            IncludeSpec::Paths(names) => {
                names.iter().any(|n| n.trim().eq_ignore_ascii_case(path))
            }
        };
        if !requested {
            continue;
        }
        if !for_querying && flags.only_for_querying {
            continue;
        }
        plan.split_query |= flags.split_query;
        plan.paths.push(path.clone());
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::models::{Album, Image};

    #[test]
    fn test_circular_navigation_is_skipped() {
        // Album.images -> Image.album would reintroduce Album; the walk stops.
        let paths = related_paths(Album::static_schema(), 3);
        assert!(paths.contains_key("images"));
        assert!(!paths.contains_key("images.album"));
        // The non-circular branch below images survives.
        assert!(paths.contains_key("images.tags"));
    }

    #[test]
    fn test_split_query_propagates_down_branch() {
        let paths = related_paths(Album::static_schema(), 3);
        // images is declared split; everything under it inherits the flag.
        assert!(paths["images"].split_query);
        assert!(paths["images.tags"].split_query);
    }

    #[test]
    fn test_depth_limit() {
        let paths = related_paths(Album::static_schema(), 0);
        assert!(paths.contains_key("images"));
        assert!(!paths.contains_key("images.tags"));
    }

    #[test]
    fn test_query_only_paths_excluded_from_update_loads() {
        let schema = Image::static_schema();
        let querying = resolve_includes(schema, &IncludeSpec::All, 3, true);
        assert!(querying.paths.iter().any(|p| p == "tags"));

        let updating = resolve_includes(schema, &IncludeSpec::All, 3, false);
        assert!(!updating.paths.iter().any(|p| p == "tags"));
        assert!(updating.paths.iter().any(|p| p == "album"));
    }

    #[test]
    fn test_unknown_requested_paths_are_dropped() {
        let schema = Image::static_schema();
        let plan = resolve_includes(
            schema,
            &IncludeSpec::paths(["album", "bogus.path"]),
            3,
            true,
        );
        assert_eq!(plan.paths, vec!["album".to_string()]);
    }

    #[test]
    fn test_requested_path_matching_is_case_insensitive() {
        let schema = Image::static_schema();
        let plan = resolve_includes(schema, &IncludeSpec::paths(["Album"]), 3, true);
        assert_eq!(plan.paths, vec!["album".to_string()]);
    }

    #[test]
    fn test_one_split_include_switches_the_whole_load() {
        let schema = Album::static_schema();
        let plan = resolve_includes(schema, &IncludeSpec::paths(["images"]), 3, true);
        assert!(plan.split_query);

        let scalar_only = resolve_includes(
            Image::static_schema(),
            &IncludeSpec::paths(["album"]),
            3,
            true,
        );
        assert!(!scalar_only.split_query);
    }
}
