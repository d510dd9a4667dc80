//! Attach node names to records by scanning host_vars documents.
//!
//! Matching is a cheap line scan for the `service_tag:` marker rather than a
//! structured parse. Only documents selected for editing are parsed in full,
//! later, by the editor.
use crate::model::CanonicalDataset;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker located by the line scan.
pub const SERVICE_TAG_MARKER: &str = "service_tag:";

const DOCUMENT_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];

/// A host_vars document and the node it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub path: PathBuf,
    pub node: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub scanned: usize,
    pub matched: usize,
    pub failed: usize,
}

/// List documents named `<node>.<...domain...>.yml`, sorted by file name.
///
/// An unreadable inventory directory is fatal; it is not a per-document error.
pub fn list_documents(inventory_dir: &Path, domain: &str) -> Result<Vec<DocumentFile>> {
    let mut documents = Vec::new();
    let entries = fs::read_dir(inventory_dir)
        .with_context(|| format!("read inventory dir {}", inventory_dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("read inventory dir {}", inventory_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_document_name(name, domain) {
            continue;
        }
        let node = node_from_file_name(name);
        documents.push(DocumentFile { path, node });
    }
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

pub fn is_document_name(name: &str, domain: &str) -> bool {
    DOCUMENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) && name.contains(domain)
}

/// Node identifier is everything before the first `.`.
pub fn node_from_file_name(name: &str) -> String {
    name.split('.').next().unwrap_or(name).to_string()
}

/// First `service_tag:` value in the text, upper-cased.
///
/// Documents shorter than two lines carry no usable host vars.
pub fn scan_service_tag(text: &str) -> Option<String> {
    if text.lines().count() < 2 {
        return None;
    }
    let line = text.lines().find(|line| line.contains(SERVICE_TAG_MARKER))?;
    let (_, value) = line.split_once(':')?;
    let tag = value.trim().to_uppercase();
    (!tag.is_empty()).then_some(tag)
}

/// Scan each document and claim the matching record for its node.
pub fn match_documents(documents: &[DocumentFile], dataset: &mut CanonicalDataset) -> MatchSummary {
    let mut summary = MatchSummary::default();
    for document in documents {
        summary.scanned += 1;
        let text = match fs::read_to_string(&document.path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %document.path.display(), "skipping document scan: {err}");
                summary.failed += 1;
                continue;
            }
        };
        let Some(tag) = scan_service_tag(&text) else {
            tracing::debug!(node = %document.node, "no service tag line");
            continue;
        };
        match dataset.get_mut(&tag) {
            Some(record) => {
                tracing::debug!(node = %document.node, tag = %tag, "matched document");
                record.node = Some(document.node.clone());
                summary.matched += 1;
            }
            None => tracing::debug!(node = %document.node, tag = %tag, "tag not in dataset"),
        }
    }
    summary
}
