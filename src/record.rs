//! Parsed definition documents and their catalog records.
//!
//! A definition is a YAML mapping with an `info` block and an opaque body. The
//! `info` block is read leniently: any field may be missing, scalars and
//! sequences are both accepted where the format allows either, and unknown
//! severities pass through untouched. Only a document that is not a mapping is
//! rejected.

use crate::error::{CatalogError, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension (compared case-insensitively) that marks a definition file.
pub const DEFINITION_EXTENSION: &str = "yaml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
            Severity::Other(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "info" => Severity::Info,
            _ => Severity::Other(value.to_string()),
        }
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata from a definition's `info` block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Info {
    pub name: Option<String>,
    pub author: Option<String>,
    pub severity: Option<Severity>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    /// Ordered references; the first one is canonical.
    pub reference: Vec<String>,
    pub cve_id: Option<String>,
}

impl Info {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Mapping(map)) = value else {
            return Self::default();
        };
        let classification = map.get("classification");
        Self {
            name: map.get("name").and_then(scalar_text),
            author: map.get("author").and_then(joined_text),
            severity: map
                .get("severity")
                .and_then(scalar_text)
                .map(|raw| Severity::from(raw.as_str())),
            tags: map.get("tags").map(text_list).unwrap_or_default(),
            description: map.get("description").and_then(scalar_text),
            reference: map.get("reference").map(text_list).unwrap_or_default(),
            cve_id: classification
                .and_then(|c| c.get("cve-id"))
                .and_then(joined_text),
        }
    }
}

/// A parsed document with no location attached yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub id: Option<String>,
    pub info: Info,
    pub document: Mapping,
    pub raw_text: String,
}

impl Definition {
    /// Parse definition text; `origin` only labels the error.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(CatalogError::Parse {
                origin: origin.to_string(),
                message: "content is empty".to_string(),
            });
        }
        let value: Value = serde_yaml::from_str(text).map_err(|err| CatalogError::Parse {
            origin: origin.to_string(),
            message: err.to_string(),
        })?;
        let Value::Mapping(document) = value else {
            return Err(CatalogError::Parse {
                origin: origin.to_string(),
                message: "top-level value is not a mapping".to_string(),
            });
        };
        Ok(Self {
            id: document.get("id").and_then(scalar_text),
            info: Info::from_value(document.get("info")),
            document,
            raw_text: text.to_string(),
        })
    }

    /// Re-serialize the document.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.document).map_err(|err| CatalogError::Parse {
            origin: self.id.clone().unwrap_or_default(),
            message: err.to_string(),
        })
    }
}

/// One definition as held by the catalog.
#[derive(Clone, Debug)]
pub struct Record {
    /// Absolute backing-file path; the catalog's primary key.
    pub identity: PathBuf,
    /// Path relative to the loaded root.
    pub relative_name: PathBuf,
    pub definition: Definition,
    content_hash: String,
    haystack: String,
}

impl Record {
    pub fn new(definition: Definition, identity: PathBuf, relative_name: PathBuf) -> Self {
        let content_hash = content_hash(&definition.raw_text);
        let haystack = definition.raw_text.to_lowercase();
        Self {
            identity,
            relative_name,
            definition,
            content_hash,
            haystack,
        }
    }

    pub fn info(&self) -> &Info {
        &self.definition.info
    }

    pub fn raw_text(&self) -> &str {
        &self.definition.raw_text
    }

    /// Document entries other than `id` and `info`.
    pub fn body(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.definition
            .document
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), Some("id") | Some("info")))
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Lowercased raw text used for substring search.
    pub(crate) fn haystack(&self) -> &str {
        &self.haystack
    }

    pub fn display_name(&self) -> String {
        display_relative(&self.relative_name)
    }

    pub fn row(&self) -> RecordRow {
        let info = self.info();
        RecordRow {
            name: self.display_name(),
            id: self.definition.id.clone(),
            severity: info
                .severity
                .as_ref()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            author: info.author.clone().unwrap_or_default(),
            tags: info.tags.join(", "),
            cve_id: info.cve_id.clone().unwrap_or_default(),
            reference: info.reference.first().cloned().unwrap_or_default(),
            description: info.description.clone().unwrap_or_default(),
        }
    }
}

/// Flattened columns for list views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordRow {
    pub name: String,
    pub id: Option<String>,
    pub severity: String,
    pub author: String,
    pub tags: String,
    pub cve_id: String,
    pub reference: String,
    pub description: String,
}

/// Hex SHA-256 of the exact file text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when the file name ends in `.yaml`, any case. A bare `.yaml` counts.
pub fn has_definition_extension(path: &Path) -> bool {
    let suffix = format!(".{DEFINITION_EXTENSION}");
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|name| name.ends_with(&suffix))
}

/// Forward-slash rendering so names compare the same on every platform.
pub fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn joined_text(value: &Value) -> Option<String> {
    let items = text_list(value);
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}
