//! Sync configuration and path handling.
//!
//! The config is a small JSON file kept next to the inventory it describes;
//! relative paths inside it resolve against the file's own directory.
/// Current schema version for `config.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Directory name under the user config dir holding the default config.
pub const CONFIG_DIR_NAME: &str = "inventory-sync";
/// File name of the default config.
pub const CONFIG_FILE_NAME: &str = "config.json";

mod load;
mod paths;
mod types;

pub use load::{
    config_stub, default_config, default_config_path, load_config, validate_config, write_config,
};
pub use paths::SyncPaths;
pub use types::*;
