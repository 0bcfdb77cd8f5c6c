//! Shared types, error model, and configuration for the company enricher.
//!
//! This crate is the foundation depended on by all other enricher crates.
//! It provides:
//! - [`EnricherError`], the unified error type
//! - Domain types ([`SourceRecord`], [`EnrichedRecord`], [`RunId`], [`RunSummary`])
//! - Configuration ([`AppConfig`], [`DatabaseConfig`], [`ApiConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, DatabaseConfig, RunConfig, WriteFailurePolicy, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{EnricherError, Result};
pub use types::{EnrichedRecord, RunId, RunSummary, SkipReason, SourceRecord};
