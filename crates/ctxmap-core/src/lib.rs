//! Core types, configuration, and error handling for ctxmap.
//!
//! This crate provides the shared foundation used by the engine and the CLI:
//! - [`MapError`]: unified error type using `thiserror`
//! - [`MapConfig`]: configuration loaded from `.ctxmap.toml`
//! - [`OutputFormat`]: how command results are printed

mod config;
mod error;
mod types;

pub use config::{MapConfig, MapSection, NavigationConfig, RankingConfig};
pub use error::MapError;
pub use types::{to_json, OutputFormat};

/// A convenience `Result` type for ctxmap operations.
pub type Result<T> = std::result::Result<T, MapError>;
