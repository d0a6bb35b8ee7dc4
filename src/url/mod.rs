//! URL handling module for Pagesweep
//!
//! This module builds page locators from the configured template and resolves
//! references found inside rendered pages (frames, reveal controls).

mod resolve;
mod template;

// Re-export main types and functions
pub use resolve::resolve_link;
pub use template::{UrlTemplate, START_PLACEHOLDER};
