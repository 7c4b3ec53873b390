//! Shared types, error model, and configuration for scriptorium.
//!
//! This crate is the foundation depended on by all other scriptorium crates.
//! It provides:
//! - [`ScriptoriumError`]: the unified error type
//! - Domain types ([`LiturgyEntry`], [`SeasonIndex`])
//! - Configuration ([`AppConfig`], [`SinkConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, LinkerConfig, LiturgyConfig, SinkConfig, config_dir,
    config_file_path, default_seasons, init_config, load_config, load_config_from,
};
pub use error::{Result, ScriptoriumError};
pub use types::{LiturgyEntry, SeasonIndex};
