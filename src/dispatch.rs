//! Classifies a raw user input string into a query kind and, for the
//! non-simple kinds, executes it directly against a dictionary set.
//! Grounded on `lib.cpp`'s `analyzeQuery`.

use crate::query::{self, FuzzyMatch};
use crate::set::DictionarySet;

/// The kind of lookup a raw input string asks for, per `analyzeQuery`'s
/// precedence: `/` prefix wins, then `|` prefix, then `*`/`?` after
/// backslash-stripping, else a simple lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    Fuzzy(String),
    Data(String),
    Glob(String),
    Simple(String),
}

pub fn analyze_query(input: &str) -> QueryKind {
    if let Some(rest) = input.strip_prefix('/') {
        return QueryKind::Fuzzy(rest.to_string());
    }
    if let Some(rest) = input.strip_prefix('|') {
        return QueryKind::Data(rest.to_string());
    }

    let stripped: String = input.chars().filter(|&c| c != '\\').collect();
    if stripped.contains('*') || stripped.contains('?') {
        QueryKind::Glob(stripped)
    } else {
        QueryKind::Simple(input.to_string())
    }
}

/// The result of executing a non-simple query. Simple queries are left to
/// the caller (typically [`crate::backend`]) since they need per-dictionary
/// rendering, not just a headword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Fuzzy(Vec<FuzzyMatch>),
    Glob(Vec<String>),
    Data(Vec<String>),
    /// The classifier decided this was a simple lookup; the caller is
    /// expected to run it itself (see [`crate::backend::StarDictBackend`]).
    Simple(String),
}

pub fn dispatch(set: &mut DictionarySet, input: &str) -> DispatchResult {
    match analyze_query(input) {
        QueryKind::Fuzzy(word) => {
            let mut merged: Vec<FuzzyMatch> = Vec::new();
            for dict in set.dictionaries_mut() {
                merged.extend(query::fuzzy_lookup(dict, &word, 10));
            }
            merged.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
            merged.dedup_by(|a, b| a.word == b.word);
            DispatchResult::Fuzzy(merged)
        }
        QueryKind::Data(q) => DispatchResult::Data(query::data_lookup(set, &q)),
        QueryKind::Glob(pattern) => DispatchResult::Glob(query::glob_lookup(set, &pattern)),
        QueryKind::Simple(word) => DispatchResult::Simple(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_precedence() {
        assert_eq!(analyze_query("/foo"), QueryKind::Fuzzy("foo".into()));
        assert_eq!(analyze_query("|foo bar"), QueryKind::Data("foo bar".into()));
        assert_eq!(analyze_query("foo*"), QueryKind::Glob("foo*".into()));
        assert_eq!(analyze_query("foo\\*bar"), QueryKind::Glob("foo*bar".into()));
        assert_eq!(analyze_query("foo"), QueryKind::Simple("foo".into()));
    }
}
