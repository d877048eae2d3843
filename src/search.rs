//! Boolean full-text search over record text.
//!
//! Queries are whitespace-separated terms. A literal `AND` token makes every
//! term required; otherwise a literal `OR` token makes any term sufficient;
//! with neither, all terms are required. Terms match as case-insensitive
//! substrings of the whole document text.

use crate::record::Record;

const AND_TOKEN: &str = "AND";
const OR_TOKEN: &str = "OR";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    source: String,
    mode: MatchMode,
    terms: Vec<String>,
}

impl Query {
    /// Compile a query string. Returns `None` when no terms remain, which
    /// callers treat as "no predicate".
    pub fn parse(input: &str) -> Option<Self> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let (mode, operator) = if tokens.contains(&AND_TOKEN) {
            (MatchMode::All, Some(AND_TOKEN))
        } else if tokens.contains(&OR_TOKEN) {
            (MatchMode::Any, Some(OR_TOKEN))
        } else {
            (MatchMode::All, None)
        };
        let terms: Vec<String> = tokens
            .into_iter()
            .filter(|token| Some(*token) != operator)
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return None;
        }
        Some(Self {
            source: input.trim().to_string(),
            mode,
            terms,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matches(&self, record: &Record) -> bool {
        let text = record.haystack();
        match self.mode {
            MatchMode::All => self.terms.iter().all(|term| text.contains(term.as_str())),
            MatchMode::Any => self.terms.iter().any(|term| text.contains(term.as_str())),
        }
    }
}

/// Indices of `records` that satisfy `query`, in catalog order. With no
/// query every index is returned.
pub fn filter_indices(records: &[Record], query: Option<&Query>) -> Vec<usize> {
    match query {
        None => (0..records.len()).collect(),
        Some(query) => records
            .iter()
            .enumerate()
            .filter(|(_, record)| query.matches(record))
            .map(|(idx, _)| idx)
            .collect(),
    }
}
