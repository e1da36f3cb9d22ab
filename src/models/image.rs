//! Image-library entities: images grouped into albums, tagged freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, FieldDef, NavigationDef, Reflect, Schema, Value, ValueKind};
use crate::models::generate_ulid;
use crate::store::{split_path, Loadable, MemoryContext};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub url: String,
    pub alt_text: String,
    pub description: String,
    pub content_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub album_id: Option<String>,
    #[serde(skip)]
    pub album: Option<Box<Album>>,
    #[serde(skip)]
    pub tags: Vec<Tag>,
}

impl Default for Image {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            url: String::new(),
            alt_text: String::new(),
            description: String::new(),
            content_type: String::new(),
            size: 0,
            uploaded_at: DateTime::UNIX_EPOCH,
            album_id: None,
            album: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(skip)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub image_id: String,
    pub label: String,
}

fn image_schema() -> &'static Schema {
    &IMAGE_SCHEMA
}

fn album_schema() -> &'static Schema {
    &ALBUM_SCHEMA
}

fn tag_schema() -> &'static Schema {
    &TAG_SCHEMA
}

static IMAGE_SCHEMA: Schema = Schema {
    entity: "Image",
    fields: &[
        FieldDef { name: "id", kind: ValueKind::Text },
        FieldDef { name: "name", kind: ValueKind::Text },
        FieldDef { name: "url", kind: ValueKind::Text },
        FieldDef { name: "alt_text", kind: ValueKind::Text },
        FieldDef { name: "description", kind: ValueKind::Text },
        FieldDef { name: "content_type", kind: ValueKind::Text },
        FieldDef { name: "size", kind: ValueKind::Int },
        FieldDef { name: "uploaded_at", kind: ValueKind::DateTime },
        FieldDef { name: "album_id", kind: ValueKind::Text },
    ],
    primary_key: &["id"],
    navigations: &[
        NavigationDef {
            name: "album",
            target: album_schema,
            collection: false,
            ignore_circular_check: false,
            only_for_querying: false,
            split_query: false,
        },
        // Tags exist for search/display only; mutation loads skip them.
        NavigationDef {
            name: "tags",
            target: tag_schema,
            collection: true,
            ignore_circular_check: false,
            only_for_querying: true,
            split_query: false,
        },
    ],
};

static ALBUM_SCHEMA: Schema = Schema {
    entity: "Album",
    fields: &[
        FieldDef { name: "id", kind: ValueKind::Text },
        FieldDef { name: "title", kind: ValueKind::Text },
    ],
    primary_key: &["id"],
    navigations: &[
        // Eager-loading an image collection joined would multiply rows;
        // this navigation always loads split.
        NavigationDef {
            name: "images",
            target: image_schema,
            collection: true,
            ignore_circular_check: false,
            only_for_querying: false,
            split_query: true,
        },
    ],
};

static TAG_SCHEMA: Schema = Schema {
    entity: "Tag",
    fields: &[
        FieldDef { name: "id", kind: ValueKind::Text },
        FieldDef { name: "image_id", kind: ValueKind::Text },
        FieldDef { name: "label", kind: ValueKind::Text },
    ],
    primary_key: &["id"],
    navigations: &[],
};

impl Reflect for Image {
    fn schema(&self) -> &'static Schema {
        &IMAGE_SCHEMA
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "name" => self.name.as_str().into(),
            "url" => self.url.as_str().into(),
            "alt_text" => self.alt_text.as_str().into(),
            "description" => self.description.as_str().into(),
            "content_type" => self.content_type.as_str().into(),
            "size" => self.size.into(),
            "uploaded_at" => self.uploaded_at.into(),
            "album_id" => self.album_id.as_deref().into(),
            _ => Value::Null,
        }
    }

    fn related(&self, name: &str) -> Option<&dyn Reflect> {
        match name {
            "album" => self.album.as_deref().map(|a| a as &dyn Reflect),
            _ => None,
        }
    }
}

impl Entity for Image {
    type Key = String;

    fn static_schema() -> &'static Schema {
        &IMAGE_SCHEMA
    }

    fn key(&self) -> Option<String> {
        (!self.id.is_empty()).then(|| self.id.clone())
    }

    fn set_key(&mut self, key: String) {
        self.id = key;
    }

    fn generate_key() -> Option<String> {
        Some(generate_ulid())
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "id" => set_text(&mut self.id, value),
            "name" => set_text(&mut self.name, value),
            "url" => set_text(&mut self.url, value),
            "alt_text" => set_text(&mut self.alt_text, value),
            "description" => set_text(&mut self.description, value),
            "content_type" => set_text(&mut self.content_type, value),
            "size" => match value.as_int() {
                Some(v) => {
                    self.size = v;
                    true
                }
                None => false,
            },
            "uploaded_at" => match value.as_datetime() {
                Some(v) => {
                    self.uploaded_at = v;
                    true
                }
                None => false,
            },
            "album_id" => match value {
                Value::Null => {
                    self.album_id = None;
                    true
                }
                Value::Text(v) => {
                    self.album_id = Some(v);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn display_key(key: &String) -> String {
        key.clone()
    }
}

impl Loadable for Image {
    fn load_path(&mut self, path: &str, ctx: &MemoryContext) {
        let (head, rest) = split_path(path);
        match head {
            "album" => {
                if self.album.is_none() {
                    if let Some(album_id) = &self.album_id {
                        self.album = ctx.find::<Album>(album_id).map(Box::new);
                    }
                }
                if let (Some(rest), Some(album)) = (rest, self.album.as_deref_mut()) {
                    album.load_path(rest, ctx);
                }
            }
            "tags" => {
                self.tags = ctx
                    .snapshot_rows::<Tag>()
                    .into_iter()
                    .filter(|t| t.image_id == self.id)
                    .collect();
            }
            _ => {}
        }
    }
}

impl Reflect for Album {
    fn schema(&self) -> &'static Schema {
        &ALBUM_SCHEMA
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "title" => self.title.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Album {
    type Key = String;

    fn static_schema() -> &'static Schema {
        &ALBUM_SCHEMA
    }

    fn key(&self) -> Option<String> {
        (!self.id.is_empty()).then(|| self.id.clone())
    }

    fn set_key(&mut self, key: String) {
        self.id = key;
    }

    fn generate_key() -> Option<String> {
        Some(generate_ulid())
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "id" => set_text(&mut self.id, value),
            "title" => set_text(&mut self.title, value),
            _ => false,
        }
    }

    fn display_key(key: &String) -> String {
        key.clone()
    }
}

impl Loadable for Album {
    fn load_path(&mut self, path: &str, ctx: &MemoryContext) {
        let (head, rest) = split_path(path);
        if head != "images" {
            return;
        }
        if self.images.is_empty() {
            self.images = ctx
                .snapshot_rows::<Image>()
                .into_iter()
                .filter(|i| i.album_id.as_deref() == Some(self.id.as_str()))
                .collect();
        }
        if let Some(rest) = rest {
            for image in &mut self.images {
                image.load_path(rest, ctx);
            }
        }
    }
}

impl Reflect for Tag {
    fn schema(&self) -> &'static Schema {
        &TAG_SCHEMA
    }

    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.as_str().into(),
            "image_id" => self.image_id.as_str().into(),
            "label" => self.label.as_str().into(),
            _ => Value::Null,
        }
    }
}

impl Entity for Tag {
    type Key = String;

    fn static_schema() -> &'static Schema {
        &TAG_SCHEMA
    }

    fn key(&self) -> Option<String> {
        (!self.id.is_empty()).then(|| self.id.clone())
    }

    fn set_key(&mut self, key: String) {
        self.id = key;
    }

    fn generate_key() -> Option<String> {
        Some(generate_ulid())
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "id" => set_text(&mut self.id, value),
            "image_id" => set_text(&mut self.image_id, value),
            "label" => set_text(&mut self.label, value),
            _ => false,
        }
    }

    fn display_key(key: &String) -> String {
        key.clone()
    }
}

impl Loadable for Tag {}

fn set_text(target: &mut String, value: Value) -> bool {
    match value {
        Value::Text(v) => {
            *target = v;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_none_until_assigned() {
        let mut image = Image::default();
        assert!(image.key().is_none());
        image.set_key("01H".into());
        assert_eq!(image.key().as_deref(), Some("01H"));
    }

    #[test]
    fn test_set_field_rejects_wrong_kind() {
        let mut image = Image::default();
        assert!(image.set_field("size", Value::Int(9)));
        assert!(!image.set_field("size", Value::Text("nine".into())));
        assert_eq!(image.size, 9);
    }

    #[test]
    fn test_album_id_accepts_null() {
        let mut image = Image::default();
        image.album_id = Some("a1".into());
        assert!(image.set_field("album_id", Value::Null));
        assert!(image.album_id.is_none());
    }
}
