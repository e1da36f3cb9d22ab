//! Domain entities and their static schemas.

mod image;

pub use image::{Album, Image, Tag};

use ulid::Ulid;

/// Fresh sortable string identifier for store-generated keys.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
