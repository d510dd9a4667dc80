//! Typed paths derived from a loaded config.
//!
//! Relative config entries resolve against the directory holding the config
//! file, so a config can travel with the inventory checkout.
use super::SyncConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SyncPaths {
    base: PathBuf,
    inventory_dir: PathBuf,
    exports: Vec<PathBuf>,
    full_dataset: PathBuf,
    clean_dataset: PathBuf,
    audit_log: PathBuf,
}

impl SyncPaths {
    /// Resolve every path in `config` against `base`.
    pub fn new(base: &Path, config: &SyncConfig) -> Self {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };
        Self {
            base: base.to_path_buf(),
            inventory_dir: resolve(&config.inventory_dir),
            exports: config.exports.iter().map(|path| resolve(path)).collect(),
            full_dataset: resolve(&config.outputs.full_dataset),
            clean_dataset: resolve(&config.outputs.clean_dataset),
            audit_log: resolve(&config.outputs.audit_log),
        }
    }

    /// Resolve against the directory containing `config_path`.
    pub fn for_config_file(config_path: &Path, config: &SyncConfig) -> Self {
        let base = config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(base, config)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn inventory_dir(&self) -> &Path {
        &self.inventory_dir
    }

    pub fn exports(&self) -> &[PathBuf] {
        &self.exports
    }

    pub fn full_dataset_path(&self) -> &Path {
        &self.full_dataset
    }

    pub fn clean_dataset_path(&self) -> &Path {
        &self.clean_dataset
    }

    pub fn audit_log_path(&self) -> &Path {
        &self.audit_log
    }
}
