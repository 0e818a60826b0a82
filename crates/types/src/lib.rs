//! Shared types for the cascade configuration system
//!
//! This crate contains the configuration tree value type, path addressing
//! helpers and the error taxonomy used across the cascade crates.

pub mod error;
pub mod path;
pub mod value;

// Re-export commonly used types
pub use error::{CascadeError, DocumentError, Result};
pub use path::{get_path, nest_at, parse_path, set_path, unset_path, Segment};
pub use value::{Map, Value};
