//! Configuration file parsing for hfpgw
//!
//! Supports `config.toml` under the platform config directory, or any file
//! given with `--config`.

pub mod settings;
pub mod types;

pub use settings::{default_config_path, load_settings, parse_settings, CONFIG_FILENAME};
pub use types::*;
