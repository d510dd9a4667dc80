//! JSON schema types for `config.json`.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub schema_version: u32,
    /// Fleet domain; document names embed it and management hosts live under it.
    pub domain: String,
    /// Directory holding one host_vars document per node.
    pub inventory_dir: PathBuf,
    /// Vendor exports, merged in order (earlier files win on conflicts).
    pub exports: Vec<PathBuf>,
    #[serde(default)]
    pub outputs: OutputPaths,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub serializer: SerializerConfig,
}

/// Where the run writes its tabular artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub full_dataset: PathBuf,
    pub clean_dataset: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            full_dataset: PathBuf::from("output.csv"),
            clean_dataset: PathBuf::from("output_clean.csv"),
            audit_log: PathBuf::from("unedited.csv"),
        }
    }
}

/// External name-resolution command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub enabled: bool,
    /// Command line; the hostname is appended as the final argument.
    pub command: String,
    pub timeout_secs: u64,
    /// Extra attempts after a failed invocation. A clean "no address" answer is not retried.
    pub retries: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "host".to_string(),
            timeout_secs: 10,
            retries: 1,
        }
    }
}

/// Output formatting for rewritten documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Replaced values keep the quote style of the value they replace.
    pub preserve_quotes: bool,
    /// Emit a `---` marker when the document lacks one.
    pub explicit_document_start: bool,
    pub mapping_indent: usize,
    /// List item content sits `sequence_indent - sequence_offset` columns
    /// past the dash. Must leave room for `- `.
    pub sequence_indent: usize,
    /// Dash column of list items relative to their parent's content indent.
    pub sequence_offset: usize,
}

impl SerializerConfig {
    /// Leading spaces for list items under a top-level key.
    pub fn list_item_indent(&self) -> usize {
        self.mapping_indent + self.sequence_offset
    }

    /// Spaces between a list item's dash and its content.
    pub fn list_item_gap(&self) -> usize {
        self.sequence_indent
            .saturating_sub(self.sequence_offset)
            .saturating_sub(1)
            .max(1)
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            preserve_quotes: true,
            explicit_document_start: true,
            mapping_indent: 2,
            sequence_indent: 2,
            sequence_offset: 0,
        }
    }
}
