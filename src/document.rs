//! Format-preserving model of a host_vars document.
//!
//! The document is validated and read through `serde_yaml`, but edits are
//! applied to the raw text: each top-level key owns its original lines plus
//! the blank lines and comments sitting above it. Keys that are not edited are
//! re-emitted byte for byte, in their original order.
//!
//! Only documents whose root is a block mapping are accepted. If the line scan
//! cannot find exactly the keys `serde_yaml` parsed, in the same order, the
//! document is rejected rather than edited blind.
//!
//! Documents written with CRLF line endings are rendered back with CRLF.
use crate::config::SerializerConfig;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

const DOCUMENT_START: &str = "---";
const DOCUMENT_END: &str = "...";
const LF: &str = "\n";
const CRLF: &str = "\r\n";

/// How a scalar value is quoted on its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Plain,
    Single,
    Double,
}

/// One top-level key with its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    /// Blank lines and column-0 comments directly above the key.
    leading: Vec<String>,
    /// The key line and every indented line belonging to its value.
    lines: Vec<String>,
    quote: QuoteStyle,
}

impl Entry {
    fn scalar(key: &str, value: &str, quote: QuoteStyle, leading: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            leading,
            lines: vec![format!("{key}: {}", render_scalar(value, quote))],
            quote,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn quote_style(&self) -> QuoteStyle {
        self.quote
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    /// Directives and the `---` line, when present.
    preamble: Vec<String>,
    has_start_marker: bool,
    entries: Vec<Entry>,
    /// Trivia after the last key, plus a `...` end marker and anything after it.
    trailer: Vec<String>,
    values: Mapping,
    line_ending: &'static str,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(text).context("parse YAML")?;
        let Value::Mapping(values) = root else {
            bail!("document root is not a mapping");
        };

        let lines: Vec<&str> = text.lines().collect();
        let mut preamble = Vec::new();
        let mut has_start_marker = false;
        let mut idx = 0;
        if let Some(first) = lines.iter().position(|line| !is_trivia(line)) {
            if lines[first].starts_with('%') || is_start_marker(lines[first]) {
                let marker = lines[first..]
                    .iter()
                    .position(|line| is_start_marker(line))
                    .map(|offset| first + offset)
                    .ok_or_else(|| anyhow!("directive without a document start marker"))?;
                let rest = lines[marker][DOCUMENT_START.len()..].trim();
                if !rest.is_empty() && !rest.starts_with('#') {
                    bail!("content on the document start line is not supported");
                }
                preamble = lines[..=marker].iter().map(|line| line.to_string()).collect();
                has_start_marker = true;
                idx = marker + 1;
            }
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut trailer = Vec::new();
        for (offset, line) in lines[idx..].iter().enumerate() {
            if is_end_marker(line) {
                trailer.append(&mut pending);
                trailer.extend(lines[idx + offset..].iter().map(|line| line.to_string()));
                break;
            }
            if is_start_marker(line) {
                bail!("multiple documents are not supported");
            }
            if is_trivia(line) || (entries.is_empty() && line.trim_start().starts_with('#')) {
                pending.push(line.to_string());
                continue;
            }
            let key = if line.starts_with([' ', '\t']) {
                None
            } else {
                top_level_key(line)
            };
            match key {
                Some((key, quote)) => entries.push(Entry {
                    key,
                    leading: std::mem::take(&mut pending),
                    lines: vec![line.to_string()],
                    quote,
                }),
                None => {
                    let current = entries
                        .last_mut()
                        .ok_or_else(|| anyhow!("content before the first top-level key"))?;
                    current.lines.append(&mut pending);
                    current.lines.push(line.to_string());
                }
            }
        }
        pending.append(&mut trailer);
        let trailer = pending;

        let scanned: Vec<&str> = entries.iter().map(|entry| entry.key.as_str()).collect();
        let parsed: Vec<String> = values.keys().map(scalar_text).collect();
        if scanned != parsed {
            bail!(
                "top-level keys could not be located line by line (scanned {}, parsed {})",
                scanned.len(),
                parsed.len()
            );
        }

        Ok(Self {
            preamble,
            has_start_marker,
            entries,
            trailer,
            values,
            line_ending: line_ending(text),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::key)
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    /// `"\r\n"` when the source used CRLF line endings, otherwise `"\n"`.
    pub fn line_ending(&self) -> &'static str {
        self.line_ending
    }

    /// Set `key` to a scalar `value`, positioned directly after `anchor`.
    ///
    /// Returns `false` without touching the document when the key already
    /// holds a value with the same string form. Otherwise the old entry is
    /// dropped and the new one is placed after `anchor`, or appended when the
    /// anchor is absent or not given. With `preserve_quotes`, the new line
    /// keeps the old value's quote style and the comments above it.
    pub fn insert_or_replace(
        &mut self,
        key: &str,
        value: &str,
        anchor: Option<&str>,
        serializer: &SerializerConfig,
    ) -> bool {
        if self.get(key).is_some_and(|existing| scalar_text(existing) == value) {
            return false;
        }

        let previous = self.remove_entry(key);
        let (quote, leading) = match previous {
            Some(entry) if serializer.preserve_quotes => (entry.quote, entry.leading),
            Some(entry) => (QuoteStyle::Plain, entry.leading),
            None => (QuoteStyle::Plain, Vec::new()),
        };
        let entry = Entry::scalar(key, value, quote, leading);
        let entries = std::mem::take(&mut self.entries);
        self.entries = rebuilt_with_insertion(entries, entry, anchor);
        self.values
            .insert(Value::String(key.to_string()), Value::String(value.to_string()));
        true
    }

    fn remove_entry(&mut self, key: &str) -> Option<Entry> {
        let idx = self.entries.iter().position(|entry| entry.key == key)?;
        self.values.remove(key);
        Some(self.entries.remove(idx))
    }

    /// Serialize back to text, terminated with the document's line ending.
    pub fn render(&self, serializer: &SerializerConfig) -> String {
        let mut out: Vec<&str> = Vec::new();
        if serializer.explicit_document_start && !self.has_start_marker {
            out.push(DOCUMENT_START);
        }
        out.extend(self.preamble.iter().map(String::as_str));
        for entry in &self.entries {
            out.extend(entry.leading.iter().map(String::as_str));
            out.extend(entry.lines.iter().map(String::as_str));
        }
        out.extend(self.trailer.iter().map(String::as_str));
        let mut text = out.join(self.line_ending);
        text.push_str(self.line_ending);
        text
    }
}

/// Line ending used by `text`, judged by its first line break.
pub fn line_ending(text: &str) -> &'static str {
    match text.find('\n') {
        Some(idx) if text[..idx].ends_with('\r') => CRLF,
        _ => LF,
    }
}

/// Copy `entries` in order, placing `entry` right after `anchor`.
///
/// Falls back to appending when no anchor is given or it is not present.
pub fn rebuilt_with_insertion(entries: Vec<Entry>, entry: Entry, anchor: Option<&str>) -> Vec<Entry> {
    let anchor = anchor.filter(|anchor| entries.iter().any(|existing| existing.key == *anchor));
    let Some(anchor) = anchor else {
        let mut entries = entries;
        entries.push(entry);
        return entries;
    };

    let mut rebuilt = Vec::with_capacity(entries.len() + 1);
    let mut pending = Some(entry);
    for existing in entries {
        let is_anchor = existing.key == anchor;
        rebuilt.push(existing);
        if is_anchor {
            if let Some(entry) = pending.take() {
                rebuilt.push(entry);
            }
        }
    }
    rebuilt
}

/// String form of a YAML value, used for change detection.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(value)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Render a scalar for a `key: value` line.
///
/// Plain style is only used when the text reads back as the same string.
pub fn render_scalar(value: &str, quote: QuoteStyle) -> String {
    let needs_escapes = value.chars().any(char::is_control);
    match quote {
        QuoteStyle::Double => double_quoted(value),
        _ if needs_escapes => double_quoted(value),
        QuoteStyle::Single => single_quoted(value),
        QuoteStyle::Plain if plain_safe(value) => value.to_string(),
        QuoteStyle::Plain => single_quoted(value),
    }
}

fn plain_safe(value: &str) -> bool {
    if value.is_empty() || value.trim() != value || value.contains('#') {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(value), Ok(Value::String(parsed)) if parsed == value)
}

fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn double_quoted(value: &str) -> String {
    // JSON string escapes are a subset of YAML double-quoted escapes.
    serde_json::to_string(value).unwrap_or_else(|_| single_quoted(value))
}

fn is_trivia(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

fn is_start_marker(line: &str) -> bool {
    line == DOCUMENT_START || line.starts_with("--- ") || line.starts_with("---\t")
}

fn is_end_marker(line: &str) -> bool {
    line == DOCUMENT_END || line.starts_with("... ") || line.starts_with("...\t")
}

fn key_regex() -> &'static Regex {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    KEY_RE.get_or_init(|| {
        Regex::new(
            r#"^(?:"(?P<dq>(?:[^"\\]|\\.)*)"|'(?P<sq>(?:[^']|'')*)'|(?P<plain>[^\s#\-?:,\[\]{}&*!|>'"%@`][^#]*?|-[^\s#][^#]*?))[ \t]*:(?:[ \t]+(?P<value>.*)|$)"#,
        )
        .expect("key regex compiles")
    })
}

/// Key and value quote style for a column-0 `key: value` line.
fn top_level_key(line: &str) -> Option<(String, QuoteStyle)> {
    let caps = key_regex().captures(line)?;
    let key = if let Some(plain) = caps.name("plain") {
        plain.as_str().trim_end().to_string()
    } else if let Some(single) = caps.name("sq") {
        single.as_str().replace("''", "'")
    } else {
        let quoted = caps.name("dq")?.as_str();
        serde_yaml::from_str::<String>(&format!("\"{quoted}\"")).ok()?
    };
    let value = caps.name("value").map(|m| m.as_str().trim_start()).unwrap_or("");
    let quote = if value.starts_with('\'') {
        QuoteStyle::Single
    } else if value.starts_with('"') {
        QuoteStyle::Double
    } else {
        QuoteStyle::Plain
    };
    Some((key, quote))
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
