//! CLI command implementations

pub mod config;
pub mod resolve;
pub mod warm;

pub use config::execute as config;
pub use resolve::execute as resolve;
pub use warm::execute as warm;
