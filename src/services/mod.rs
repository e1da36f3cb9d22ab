//! Domain services composed from repositories, storage and the unit of work.

mod images;

pub use images::{ImageService, ListImages, UploadImage};
