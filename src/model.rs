//! Record and audit types shared by every stage of a sync run.
//!
//! Datasets are keyed by the upper-cased service tag so every lookup in the
//! pipeline agrees on one canonical spelling.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state for one physical asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub tag: String,
    pub end_of_service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
}

impl AssetRecord {
    pub fn new(tag: &str, end_of_service: &str) -> Self {
        Self {
            tag: normalize_tag(tag),
            end_of_service: end_of_service.to_string(),
            node: None,
            management_address: None,
        }
    }

    /// True once a configuration document has claimed this record.
    pub fn is_matched(&self) -> bool {
        self.node.as_deref().is_some_and(|node| !node.is_empty())
    }
}

/// Every record discovered across all exports, ordered by tag.
pub type CanonicalDataset = BTreeMap<String, AssetRecord>;

/// Records matched to a configuration document; the only input the editor reads.
pub type CleanDataset = BTreeMap<String, AssetRecord>;

/// Canonical spelling for a service tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_uppercase()
}

/// Why a configuration document was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditReason {
    InvalidFormat,
    MissingTag,
    UnmatchedTag,
    NoChangeNeeded,
    Error(String),
}

impl fmt::Display for AuditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditReason::InvalidFormat => f.write_str("Invalid YAML format"),
            AuditReason::MissingTag => f.write_str("Missing dell_service_tag"),
            AuditReason::UnmatchedTag => f.write_str("Service tag not in clean dataset"),
            AuditReason::NoChangeNeeded => f.write_str("No changes needed"),
            AuditReason::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

impl Serialize for AuditReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One document that was not updated, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub node: String,
    pub tag: String,
    pub reason: AuditReason,
}

impl AuditEntry {
    pub fn new(node: &str, tag: &str, reason: AuditReason) -> Self {
        Self {
            node: node.to_string(),
            tag: tag.to_string(),
            reason,
        }
    }
}

/// Restrict a canonical dataset to the records a document has claimed.
pub fn clean_dataset(dataset: &CanonicalDataset) -> CleanDataset {
    dataset
        .iter()
        .filter(|(_, record)| record.is_matched())
        .map(|(tag, record)| (tag.clone(), record.clone()))
        .collect()
}
