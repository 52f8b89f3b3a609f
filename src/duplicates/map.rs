//! The duplicate map: one kept file per class, mapped to its duplicates.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One duplicate class: the kept representative and everything else in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    /// The file left in place
    pub original: PathBuf,
    /// Other files in the class, never including `original`
    pub duplicates: Vec<PathBuf>,
}

impl DuplicateEntry {
    /// Number of files in the class, representative included.
    #[must_use]
    pub fn class_size(&self) -> usize {
        self.duplicates.len() + 1
    }
}

/// Mapping from kept representative to its set of duplicates.
///
/// Entries are kept in insertion order, which the processor makes equal to
/// the input order of each representative. Invariants maintained by
/// [`insert`](Self::insert):
///
/// - no key appears in its own value set
/// - no path appears more than once across all keys and values
/// - every entry has at least one duplicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DuplicateMap {
    entries: Vec<DuplicateEntry>,
    #[serde(skip)]
    seen: HashSet<PathBuf>,
}

impl DuplicateMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class.
    ///
    /// Paths already present in the map (including `original` itself among
    /// the duplicates) are dropped from `duplicates`. Nothing is inserted if
    /// `original` is already classified or no duplicate remains.
    ///
    /// Returns `true` if an entry was added.
    pub fn insert(&mut self, original: PathBuf, duplicates: Vec<PathBuf>) -> bool {
        if self.seen.contains(&original) {
            log::debug!("Already classified, ignoring: {}", original.display());
            return false;
        }

        let mut kept = Vec::with_capacity(duplicates.len());
        let mut local: HashSet<&Path> = HashSet::new();
        local.insert(&original);
        for path in &duplicates {
            if !self.seen.contains(path) && local.insert(path) {
                kept.push(path.clone());
            }
        }

        if kept.is_empty() {
            return false;
        }

        self.seen.insert(original.clone());
        self.seen.extend(kept.iter().cloned());
        self.entries.push(DuplicateEntry {
            original,
            duplicates: kept,
        });
        true
    }

    /// Duplicates recorded for `original`.
    #[must_use]
    pub fn get(&self, original: &Path) -> Option<&[PathBuf]> {
        self.entries
            .iter()
            .find(|e| e.original == original)
            .map(|e| e.duplicates.as_slice())
    }

    /// Number of entries (duplicate classes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DuplicateEntry> {
        self.entries.iter()
    }

    /// Kept representatives, in order.
    #[must_use]
    pub fn originals(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.original.as_path()).collect()
    }

    /// Whether `path` is a kept representative.
    #[must_use]
    pub fn contains_original(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.original == path)
    }

    /// Whether `path` appears anywhere in the map.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// All duplicates in one list, representatives excluded.
    ///
    /// This is the natural input for a move or delete batch.
    #[must_use]
    pub fn flatten(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .flat_map(|e| e.duplicates.iter().cloned())
            .collect()
    }

    /// Total number of duplicate files across all entries.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.entries.iter().map(|e| e.duplicates.len()).sum()
    }
}

impl<'a> IntoIterator for &'a DuplicateMap {
    type Item = &'a DuplicateEntry;
    type IntoIter = std::slice::Iter<'a, DuplicateEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl From<Vec<DuplicateEntry>> for DuplicateMap {
    fn from(entries: Vec<DuplicateEntry>) -> Self {
        let mut map = Self::new();
        for entry in entries {
            map.insert(entry.original, entry.duplicates);
        }
        map
    }
}
