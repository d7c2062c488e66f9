//! Configuration module for Searchlight
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, including the list of sites to crawl and index.
//!
//! # Example
//!
//! ```no_run
//! use searchlight::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Database path: {}", config.output.database_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteEntry, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
