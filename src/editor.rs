//! Apply clean records to host_vars documents.
//!
//! Each document is handled on its own: a failure to read, parse, or publish
//! one document becomes an audit entry and the rest continue. Documents are
//! only rewritten when an owned key actually changes, which keeps reruns
//! idempotent.
use crate::config::SerializerConfig;
use crate::document::{line_ending, scalar_text, Document};
use crate::matcher::DocumentFile;
use crate::model::{normalize_tag, AssetRecord, AuditEntry, AuditReason, CleanDataset};
use crate::staging::write_atomic_text;
use serde_yaml::Value;
use std::fs;

pub const SERVICE_TAG_KEY: &str = "dell_service_tag";
pub const EOS_KEY: &str = "dell_eos";
pub const IDRAC_KEY: &str = "idrac_ip";
pub const PUBLIC_MAC_KEY: &str = "public_mac";
pub const PUBLIC_IP_KEY: &str = "public_ip";
/// List whose items are re-indented after every rewrite.
pub const SLURM_PARTITIONS_KEY: &str = "slurm_partitions";

/// Result of planning an edit for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated { tag: String, text: String },
    Rejected { tag: String, reason: AuditReason },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub updated: Vec<String>,
    pub audit: Vec<AuditEntry>,
}

/// Decide what `text` should become given the clean dataset. Performs no I/O.
pub fn plan_edit(text: &str, clean: &CleanDataset, serializer: &SerializerConfig) -> EditOutcome {
    let mut doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::debug!("document rejected: {err:#}");
            return EditOutcome::Rejected {
                tag: String::new(),
                reason: AuditReason::InvalidFormat,
            };
        }
    };

    let tag = document_tag(&doc);
    if tag.is_empty() {
        return EditOutcome::Rejected {
            tag,
            reason: AuditReason::MissingTag,
        };
    }
    let Some(record) = clean.get(&tag) else {
        return EditOutcome::Rejected {
            tag,
            reason: AuditReason::UnmatchedTag,
        };
    };

    if !apply_record(&mut doc, record, serializer) {
        return EditOutcome::Rejected {
            tag,
            reason: AuditReason::NoChangeNeeded,
        };
    }

    let rendered = doc.render(serializer);
    let text = normalize_or_keep(rendered, serializer);
    EditOutcome::Updated { tag, text }
}

/// Normalized `dell_service_tag` of a parsed document; empty when absent.
pub fn document_tag(doc: &Document) -> String {
    doc.get(SERVICE_TAG_KEY)
        .map(scalar_text)
        .map(|tag| normalize_tag(&tag))
        .unwrap_or_default()
}

/// Set the owned keys from `record`. Returns whether anything changed.
pub fn apply_record(doc: &mut Document, record: &AssetRecord, serializer: &SerializerConfig) -> bool {
    let mut modified = false;

    let eos = record.end_of_service.trim();
    if !eos.is_empty() {
        modified |= doc.insert_or_replace(EOS_KEY, eos, Some(SERVICE_TAG_KEY), serializer);
    }

    let address = record
        .management_address
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty());
    if let Some(address) = address {
        let anchor = [PUBLIC_MAC_KEY, PUBLIC_IP_KEY]
            .into_iter()
            .find(|key| doc.contains_key(key));
        modified |= doc.insert_or_replace(IDRAC_KEY, address, anchor, serializer);
    }

    modified
}

/// Force every list item under `key:` to `indent` leading spaces, with
/// `dash_gap` spaces between the `-` and the item content.
///
/// The block ends at the first blank line or the first line with no leading
/// indentation that is not itself a list item. Line endings are kept.
pub fn normalize_list_indent(text: &str, key: &str, indent: usize, dash_gap: usize) -> String {
    let header = format!("{key}:");
    let pad = " ".repeat(indent);
    let gap = " ".repeat(dash_gap.max(1));
    let mut in_block = false;
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(&header) {
            in_block = true;
            out.push(line.to_string());
            continue;
        }
        if in_block {
            if let Some(item) = trimmed.strip_prefix("- ") {
                out.push(format!("{pad}-{gap}{}", item.trim_start()));
                continue;
            }
            if trimmed.is_empty() || !line.starts_with(' ') {
                in_block = false;
            }
        }
        out.push(line.to_string());
    }
    let newline = line_ending(text);
    let mut normalized = out.join(newline);
    if text.ends_with('\n') {
        normalized.push_str(newline);
    }
    normalized
}

/// Normalize the partitions list unless doing so would change what the document means.
fn normalize_or_keep(rendered: String, serializer: &SerializerConfig) -> String {
    let normalized = normalize_list_indent(
        &rendered,
        SLURM_PARTITIONS_KEY,
        serializer.list_item_indent(),
        serializer.list_item_gap(),
    );
    if normalized == rendered {
        return rendered;
    }
    let before = serde_yaml::from_str::<Value>(&rendered);
    let after = serde_yaml::from_str::<Value>(&normalized);
    match (before, after) {
        (Ok(before), Ok(after)) if before == after => normalized,
        _ => {
            tracing::warn!("list indentation pass would alter document content; keeping serializer output");
            rendered
        }
    }
}

/// Edit every document against the clean dataset.
pub fn edit_documents(
    documents: &[DocumentFile],
    clean: &CleanDataset,
    serializer: &SerializerConfig,
    dry_run: bool,
) -> EditSummary {
    let mut summary = EditSummary::default();
    for document in documents {
        let node = document.node.as_str();
        let text = match fs::read_to_string(&document.path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(node, path = %document.path.display(), "read failed: {err}");
                summary
                    .audit
                    .push(AuditEntry::new(node, "", AuditReason::Error(err.to_string())));
                continue;
            }
        };

        match plan_edit(&text, clean, serializer) {
            EditOutcome::Updated { tag, text } => {
                if dry_run {
                    tracing::info!(node, tag = %tag, "would update");
                    summary.updated.push(node.to_string());
                    continue;
                }
                match write_atomic_text(&document.path, &text) {
                    Ok(()) => {
                        tracing::info!(node, tag = %tag, "updated");
                        summary.updated.push(node.to_string());
                    }
                    Err(err) => {
                        tracing::warn!(node, "write failed: {err:#}");
                        summary
                            .audit
                            .push(AuditEntry::new(node, "", AuditReason::Error(format!("{err:#}"))));
                    }
                }
            }
            EditOutcome::Rejected { tag, reason } => {
                tracing::debug!(node, tag = %tag, reason = %reason, "not updated");
                summary.audit.push(AuditEntry::new(node, &tag, reason));
            }
        }
    }
    summary
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod tests;
