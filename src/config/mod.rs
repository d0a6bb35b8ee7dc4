//! Configuration module for Pagesweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use pagesweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("pagesweep.toml")).unwrap();
//! println!("Pages hold {} records", config.pagination.step);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, PageConfig, PaginationConfig, PoolConfig, TargetConfig, UserAgentConfig,
    MAX_POOL_SIZE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_pool_size};
