//! Dependency injection infrastructure.
//!
//! Compile-time dependency injection using the `FromRef` trait and the derive
//! macros from `di-macros`.
//!
//! - `FromRef<T>`: extract a value from a reference to `T`
//! - `#[derive(Context)]`: makes each field of a struct extractable via `FromRef`
//! - `#[derive(FromContext)]`: generates a `FromRef` impl by resolving each field
//!
//! # Example
//!
//! ```ignore
//! use crate::di::{FromContext, FromRef};
//!
//! #[derive(FromContext, Clone)]
//! #[from_context(Context = "AppContext")]
//! pub struct ImageService {
//!     images: Repository<Image>,      // resolved via FromRef<AppContext>
//!     storage: Arc<dyn ObjectStorage>,
//! }
//!
//! let service = ImageService::from_ref(&ctx);
//! ```

/// Trait for extracting a value from a reference to another type.
///
/// This is the core trait for compile-time dependency injection.
/// Types that implement `FromRef<T>` can be extracted from `&T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Blanket implementation: any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

// Re-export derive macros
pub use di_macros::{Context, FromContext};
