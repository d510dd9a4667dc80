//! Load, validate, and persist `config.json`.
use super::{SyncConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_SCHEMA_VERSION};
use super::{OutputPaths, ResolverConfig, SerializerConfig};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Build the config written by `invsync init`.
pub fn default_config(domain: &str) -> SyncConfig {
    SyncConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        domain: domain.to_string(),
        inventory_dir: PathBuf::from("inventory/host_vars"),
        exports: vec![PathBuf::from("exports/vendor_export.csv")],
        outputs: OutputPaths::default(),
        resolver: ResolverConfig::default(),
        serializer: SerializerConfig::default(),
    }
}

/// Render a pretty JSON config stub.
pub fn config_stub(domain: &str) -> Result<String> {
    serde_json::to_string_pretty(&default_config(domain)).context("serialize config stub")
}

/// Default config location under the user's config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| anyhow!("cannot determine config directory"))?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: SyncConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config in a stable JSON format.
pub fn write_config(path: &Path, config: &SyncConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(config).context("serialize config")?;
    text.push('\n');
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate schema version and user-provided settings.
pub fn validate_config(config: &SyncConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    let domain = config.domain.trim();
    if domain.is_empty() {
        return Err(anyhow!("domain must be non-empty"));
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(anyhow!(
            "domain must not start or end with '.' (got {:?})",
            config.domain
        ));
    }
    if config.inventory_dir.as_os_str().is_empty() {
        return Err(anyhow!("inventory_dir must be non-empty"));
    }
    if config.exports.is_empty() {
        return Err(anyhow!("exports must list at least one file"));
    }
    if config.resolver.enabled {
        let words = shell_words::split(&config.resolver.command)
            .with_context(|| format!("parse resolver command: {}", config.resolver.command))?;
        if words.is_empty() {
            return Err(anyhow!("resolver.command must be non-empty"));
        }
    }
    let serializer = &config.serializer;
    if serializer.mapping_indent == 0 {
        return Err(anyhow!("serializer.mapping_indent must be >= 1"));
    }
    if serializer.sequence_indent < serializer.sequence_offset + 2 {
        return Err(anyhow!(
            "serializer.sequence_indent ({}) must be at least sequence_offset + 2 ({})",
            serializer.sequence_indent,
            serializer.sequence_offset + 2
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
