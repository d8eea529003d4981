//! imgwarm - Dockerfile base-image cache warmer
//!
//! Resolves the registry base images of a multi-stage Dockerfile and
//! pre-fetches them into a local cache so builds start warm.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod error;
pub mod image;
pub mod platform;
pub mod registry;
pub mod ui;

pub use error::{is_already_cached, WarmError, WarmResult};
pub use image::Image;
