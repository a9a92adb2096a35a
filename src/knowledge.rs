//! Curated plant knowledge base: normalized label keys to plant records.

use crate::error::{Error, Result};
use crate::types::PlantRecord;
use std::collections::HashMap;
use std::path::Path;

/// Knowledge base document embedded at build time.
const BUILTIN_JSON: &str = include_str!("../data/plants.json");

/// Normalize a classifier label or lookup key.
///
/// Lowercases, strips every character outside `[a-z0-9 ]`, and collapses
/// whitespace runs to single spaces.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let stripped: String = label
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read-only mapping from normalized label keys to [`PlantRecord`]s.
///
/// Loaded once, never mutated. Iteration preserves the document's insertion
/// order, which keeps fuzzy matching deterministic.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<(String, PlantRecord)>,
    index: HashMap<String, usize>,
}

impl KnowledgeBase {
    /// Load the knowledge base shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KnowledgeBase`] if the embedded document fails
    /// validation (which would indicate a broken build).
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_JSON)
    }

    /// Parse a knowledge base from a JSON document.
    ///
    /// The document is an object mapping normalized label keys to plant
    /// records; key order in the document is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KnowledgeBase`] if the document is not valid JSON,
    /// a key is not in normalized form, or a record has an empty common
    /// name.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| Error::KnowledgeBase(format!("invalid JSON: {e}")))?;

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let record: PlantRecord = serde_json::from_value(value)
                .map_err(|e| Error::KnowledgeBase(format!("entry {key:?}: {e}")))?;
            entries.push((key, record));
        }

        Self::from_entries(entries)
    }

    /// Load a knowledge base from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KnowledgeBase`] if the file cannot be read or fails
    /// validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::KnowledgeBase(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Build a knowledge base from pre-parsed entries, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KnowledgeBase`] on duplicate keys, keys not in
    /// normalized form, or records with an empty common name.
    pub fn from_entries(entries: Vec<(String, PlantRecord)>) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, (key, record)) in entries.iter().enumerate() {
            if key.is_empty() || *key != normalize_label(key) {
                return Err(Error::KnowledgeBase(format!(
                    "key {key:?} is not a normalized label"
                )));
            }
            if record.common_name.is_empty() {
                return Err(Error::KnowledgeBase(format!(
                    "entry {key:?} has an empty common name"
                )));
            }
            if index.insert(key.clone(), position).is_some() {
                return Err(Error::KnowledgeBase(format!("duplicate key {key:?}")));
            }
        }

        Ok(Self { entries, index })
    }

    /// Look up a record by its exact normalized key.
    ///
    /// Absence is represented, not thrown.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&PlantRecord> {
        self.index
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PlantRecord)> {
        self.entries
            .iter()
            .map(|(key, record)| (key.as_str(), record))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the knowledge base holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
