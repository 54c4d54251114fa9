//! Code lists mapping source vocabulary to target-schema codes
//!
//! Terms are case-folded both when they are added and when they are looked
//! up. A missing term is always an error: incomplete tables are extended by
//! the caller, never patched with a guessed default.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// A named term → code table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeList {
    name: String,
    entries: HashMap<String, String>,
}

impl CodeList {
    /// Create an empty code list
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Create a code list from `(term, code)` pairs
    pub fn from_entries<I, T, C>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: Into<String>,
    {
        entries
            .into_iter()
            .fold(Self::new(name), |list, (term, code)| list.with_entry(term, code))
    }

    /// Add or replace an entry
    pub fn with_entry(mut self, term: impl AsRef<str>, code: impl Into<String>) -> Self {
        self.entries.insert(normalize(term.as_ref()), code.into());
        self
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a term, case-insensitively
    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(&normalize(term)).map(String::as_str)
    }

    /// Look up a term for a building, failing with
    /// [`Error::CodeListLookupFailure`] when it is not in the list
    ///
    /// The error carries the case-folded term, as it was looked up.
    pub fn lookup(&self, term: &str, building: &str) -> Result<&str> {
        self.get(term).ok_or_else(|| Error::CodeListLookupFailure {
            code_list: self.name.clone(),
            term: normalize(term),
            building: building.to_string(),
        })
    }
}

fn normalize(term: &str) -> String {
    term.to_lowercase()
}
