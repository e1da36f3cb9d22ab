//! Entity model: static schemas and dynamic field access.
//!
//! Entities describe themselves through a static [`Schema`] (scalar fields,
//! primary key, navigations) supplied by the entity author. The schema is the
//! queryable stand-in for reflection: the path resolver and the related-
//! property registry walk it instead of inspecting types at call time.

mod patch;
mod value;

pub use patch::Patch;
pub use value::{Value, ValueKind};

use std::fmt;
use std::hash::Hash;

/// A scalar field declaration on an entity schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Canonical field name, matching [`Reflect::field`] lookup.
    pub name: &'static str,
    pub kind: ValueKind,
}

/// A navigational field declaration: a reference to another entity or a
/// collection of entities, eligible for eager loading.
#[derive(Debug, Clone, Copy)]
pub struct NavigationDef {
    /// Canonical navigation name.
    pub name: &'static str,
    /// Target entity schema. A fn pointer so cyclic declarations link.
    pub target: fn() -> &'static Schema,
    /// Collection navigations are unwrapped to their element schema.
    pub collection: bool,
    /// Waives the circular-reference guard for this navigation.
    pub ignore_circular_check: bool,
    /// Excluded from includes on tracked (mutation) loads.
    pub only_for_querying: bool,
    /// Loading this navigation forces split-query mode for the whole load.
    pub split_query: bool,
}

/// Static description of an entity type.
pub struct Schema {
    pub entity: &'static str,
    pub fields: &'static [FieldDef],
    /// Primary key field names, in declaration order. May be empty; operations
    /// that need a key treat an empty primary key as a fatal configuration
    /// error rather than degrading to non-deterministic behavior.
    pub primary_key: &'static [&'static str],
    pub navigations: &'static [NavigationDef],
}

impl Schema {
    /// Case-insensitive scalar field lookup.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive navigation lookup.
    pub fn navigation(&self, name: &str) -> Option<&'static NavigationDef> {
        self.navigations
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    /// Whether the given canonical field name is part of the primary key.
    pub fn is_key_field(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("entity", &self.entity)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// Object-safe dynamic access to an entity's fields and single navigations.
///
/// Compiled path accessors walk values through this trait; entity authors
/// implement it with a straight match over canonical names.
pub trait Reflect: Send + Sync {
    fn schema(&self) -> &'static Schema;

    /// Scalar field value by canonical name.
    fn field(&self, name: &str) -> Value;

    /// Single-entity navigation by canonical name. Collection navigations and
    /// unloaded references return `None`.
    fn related(&self, name: &str) -> Option<&dyn Reflect> {
        let _ = name;
        None
    }
}

/// A persisted record type with a stable identity key.
///
/// `Default` provides the blank stub used by sparse patch updates; the key
/// accessors drive lookups, default sorting and generated-key handling.
pub trait Entity: Reflect + Clone + Default + 'static {
    /// Key type: single value or tuple for composite keys.
    type Key: Clone + Ord + Hash + Send + Sync + fmt::Debug + 'static;

    fn static_schema() -> &'static Schema;

    /// The entity's key, or `None` when it has not been assigned yet
    /// (store-generated keys before the first flush).
    fn key(&self) -> Option<Self::Key>;

    fn set_key(&mut self, key: Self::Key);

    /// Generates a fresh key for entities with store-generated identity.
    /// `None` means keys must be assigned by the caller before insert.
    fn generate_key() -> Option<Self::Key> {
        None
    }

    /// Sets a scalar field by canonical name. Returns `false` when the value
    /// kind does not match the field.
    fn set_field(&mut self, name: &str, value: Value) -> bool;

    /// Debug rendering of a key for error messages.
    fn display_key(key: &Self::Key) -> String {
        format!("{key:?}")
    }
}
