//! Shared fixtures: a composite-key entity and a keyless entity for the
//! repository edge cases, plus context/repository constructors.

use std::sync::Arc;

use stratum::config::{RepositoryOptions, SaveChangesStrategy};
use stratum::entity::{Entity, FieldDef, Reflect, Schema, Value, ValueKind};
use stratum::repository::Repository;
use stratum::store::{Loadable, MemoryContext};

/// Course enrollment, keyed by (student_id, course_id).
#[derive(Debug, Clone, Default)]
pub struct Enrollment {
    pub student_id: String,
    pub course_id: String,
    pub grade: i64,
}

static ENROLLMENT_SCHEMA: Schema = Schema {
    entity: "Enrollment",
    fields: &[
        FieldDef { name: "student_id", kind: ValueKind::Text },
        FieldDef { name: "course_id", kind: ValueKind::Text },
        FieldDef { name: "grade", kind: ValueKind::Int },
    ],
    primary_key: &["student_id", "course_id"],
    navigations: &[],
};

impl Reflect for Enrollment {
    fn schema(&self) -> &'static Schema {
        &ENROLLMENT_SCHEMA
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "student_id" => self.student_id.as_str().into(),
            "course_id" => self.course_id.as_str().into(),
            "grade" => self.grade.into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Enrollment {
    type Key = (String, String);

    fn static_schema() -> &'static Schema {
        &ENROLLMENT_SCHEMA
    }

    fn key(&self) -> Option<Self::Key> {
        (!self.student_id.is_empty() && !self.course_id.is_empty())
            .then(|| (self.student_id.clone(), self.course_id.clone()))
    }

    fn set_key(&mut self, key: Self::Key) {
        self.student_id = key.0;
        self.course_id = key.1;
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "student_id" => match value {
                Value::Text(v) => {
                    self.student_id = v;
                    true
                }
                _ => false,
            },
            "course_id" => match value {
                Value::Text(v) => {
                    self.course_id = v;
                    true
                }
                _ => false,
            },
            "grade" => match value.as_int() {
                Some(v) => {
                    self.grade = v;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl Loadable for Enrollment {}

/// An entity whose schema declares no primary key. Key-addressed operations
/// must refuse it.
#[derive(Debug, Clone, Default)]
pub struct LogLine {
    pub message: String,
}

static LOG_LINE_SCHEMA: Schema = Schema {
    entity: "LogLine",
    fields: &[FieldDef { name: "message", kind: ValueKind::Text }],
    primary_key: &[],
    navigations: &[],
};

impl Reflect for LogLine {
    fn schema(&self) -> &'static Schema {
        &LOG_LINE_SCHEMA
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "message" => self.message.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for LogLine {
    type Key = String;

    fn static_schema() -> &'static Schema {
        &LOG_LINE_SCHEMA
    }

    fn key(&self) -> Option<String> {
        None
    }

    fn set_key(&mut self, _key: String) {}

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "message" => match value {
                Value::Text(v) => {
                    self.message = v;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}

impl Loadable for LogLine {}

pub fn per_operation_options() -> RepositoryOptions {
    RepositoryOptions {
        save_changes: SaveChangesStrategy::PerOperation,
        ..RepositoryOptions::default()
    }
}

pub fn repository<E: Loadable>(ctx: &Arc<MemoryContext>) -> Repository<E> {
    Repository::new(Arc::clone(ctx), per_operation_options())
}
