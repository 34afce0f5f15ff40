//! Configuration module for Sumi-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is immutable once loaded and is shared by every
//! component through an `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring {} into {}", config.target.url, config.output.directory.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DelayConfig, FailureDisposition, IncrementalConfig, OutputConfig,
    RendererConfig, ResumeConfig, RetryConfig, TargetConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
