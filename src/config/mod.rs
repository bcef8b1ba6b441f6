//! Configuration module for cianparser
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cianparser::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Cell size: {}m", config.search.max_cell_size_meters);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CaptchaConfig, Config, HttpConfig, OutputConfig, SearchConfig, DEFAULT_BASE_URL,
    DEFAULT_CAPTCHA_SERVICE_URL, DEFAULT_USER_AGENT, MAX_OFFERS_BATCH_SIZE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
