//! Identity assignment for universal sensors
//!
//! The dispatcher numbers discovered sensors per type after the built-in
//! ones and persists the numbering so modules keep their identity across
//! restarts.

pub mod dispatcher;
pub mod image;

pub use dispatcher::RegistrationDispatcher;
pub use image::{PersistError, RegistrationImage, IMAGE_MAGIC, IMAGE_VERSION, MAX_IMAGE_SIZE};
