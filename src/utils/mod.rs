//! Utility functions shared across the codebase

pub mod text;
pub mod url;

// Re-export commonly used utilities
pub use text::{compact_ws, word_count};
pub use url::{normalize_host, normalize_url, origin_of};
