//! Dockerfile analysis
//!
//! Resolves the ordered list of registry base images a multi-stage
//! Dockerfile build needs, with ARG defaults and `--build-arg` overrides
//! applied to each FROM line.

pub mod args;
pub mod resolve;

pub use args::{parse_build_args, ArgEnv};
pub use resolve::{parse_dockerfile, resolve_base_images};
