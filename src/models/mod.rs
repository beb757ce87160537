//! Data models
//!
//! Repository records as listed by the remote platform.

pub mod repository;

// Re-export commonly used types
pub use repository::*;
