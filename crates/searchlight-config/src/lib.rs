//! Configuration for the Searchlight MCP server.
//!
//! Provides TOML-based configuration with:
//! - Typed sections (`[server]`, `[searxng]`, `[fetch]`, `[proxy]`)
//! - Config file layering (user config + project-local overrides)
//! - Environment variable overrides (`SEARXNG_URL`, `HTTP_PROXY`, ...)
//! - Startup validation of the effective settings

pub mod discovery;
pub mod env;
pub mod error;
pub mod types;
mod validate;

pub use discovery::{
    ConfigSource, LoadOptions, LoadedConfig, load_config, load_config_file,
    load_config_with_options, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
