//! Configuration types
//!
//! Board-agnostic configuration structures, serde-derived so a firmware can
//! keep them as postcard binary data next to the registration image.

pub mod types;

pub use types::*;
