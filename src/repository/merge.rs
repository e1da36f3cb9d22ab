//! Field-selection options for merge (upsert) operations.

use crate::entity::Schema;
use crate::error::AppError;

/// Controls how [`Repository::merge`](crate::repository::Repository::merge)
/// matches incoming entities against stored rows and which fields it writes.
///
/// An empty `merge_by` falls back to the primary key. `include` and `exclude`
/// narrow the written fields and are mutually exclusive; setting both is a
/// configuration error raised before any row is touched. Key fields are never
/// written.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    merge_by: Vec<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

impl MergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields whose values identify a stored row as "the same" entity.
    pub fn merge_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts writes to the named fields.
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Writes every non-key field except the named ones.
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the options against the schema and resolves every name to
    /// its canonical field. All misconfiguration surfaces here, eagerly.
    pub(crate) fn resolve(&self, schema: &'static Schema) -> Result<MergePlan, AppError> {
        if self.include.is_some() && self.exclude.is_some() {
            return Err(AppError::ConflictingMergeFieldLists {
                entity: schema.entity,
            });
        }

        let merge_by = if self.merge_by.is_empty() {
            if schema.primary_key.is_empty() {
                return Err(AppError::NoPrimaryKey(schema.entity));
            }
            schema.primary_key.to_vec()
        } else {
            let mut resolved = Vec::with_capacity(self.merge_by.len());
            for name in &self.merge_by {
                let mut candidates = schema
                    .fields
                    .iter()
                    .filter(|f| f.name.eq_ignore_ascii_case(name));
                match (candidates.next(), candidates.next()) {
                    // Exactly one case-insensitive match is the only
                    // acceptable resolution; zero and many both abort.
                    (Some(field), None) => resolved.push(field.name),
                    _ => {
                        return Err(AppError::AmbiguousMergeProperty {
                            entity: schema.entity,
                            property: name.clone(),
                        })
                    }
                }
            }
            resolved
        };

        let named = |list: &[String], name: &str| {
            list.iter().any(|n| n.eq_ignore_ascii_case(name))
        };
        let write_fields = schema
            .fields
            .iter()
            .filter(|f| !schema.is_key_field(f.name))
            .filter(|f| match (&self.include, &self.exclude) {
                (Some(include), _) => named(include, f.name),
                (_, Some(exclude)) => !named(exclude, f.name),
                _ => true,
            })
            .map(|f| f.name)
            .collect();

        Ok(MergePlan {
            merge_by,
            write_fields,
        })
    }
}

/// Resolved merge options: canonical field names only.
pub(crate) struct MergePlan {
    pub(crate) merge_by: Vec<&'static str>,
    pub(crate) write_fields: Vec<&'static str>,
}
