//! Simple, similar-word, fuzzy, glob and substring lookups. Grounded on
//! `lib.cpp` (`lookupSimilarWord`, `lookupWithFuzzy`, `lookupWithRule`,
//! `lookupData`).

use std::collections::HashSet;

use globset::{Glob, GlobMatcher};

use crate::dictionary::Single;
use crate::distance::bounded_edit_distance;
use crate::index::{stardict_compare, Location};
use crate::set::DictionarySet;

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

fn is_pure_english(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphabetic())
}

/// If `stem` ends in a doubled consonant preceded by a vowel (e.g. "runn" in
/// "running"), returns the stem with one of the doubled letters removed.
fn undouble_consonant(stem: &str) -> Option<String> {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    if n < 3 {
        return None;
    }
    let last = chars[n - 1];
    let second_last = chars[n - 2];
    let third_last = chars[n - 3];
    if last.eq_ignore_ascii_case(&second_last) && is_consonant(last) && is_vowel(third_last) {
        Some(chars[..n - 1].iter().collect())
    } else {
        None
    }
}

fn both_cases(s: &str) -> Vec<String> {
    let lower = s.to_lowercase();
    if lower == s {
        vec![s.to_string()]
    } else {
        vec![s.to_string(), lower]
    }
}

fn strip(word: &str, n: usize) -> String {
    word[..word.len() - n].to_string()
}

fn candidates_strip(word: &str, n: usize) -> Vec<String> {
    both_cases(&strip(word, n))
}

fn candidates_strip_doubled(word: &str, n: usize) -> Vec<String> {
    let stem = strip(word, n);
    let mut out = both_cases(&stem);
    if let Some(undoubled) = undouble_consonant(&stem) {
        out.extend(both_cases(&undoubled));
    }
    out
}

fn candidates_strip_doubled_plus(word: &str, n: usize, addition: &str) -> Vec<String> {
    let stem = strip(word, n);
    let mut out = candidates_strip_doubled(word, n);
    out.extend(both_cases(&format!("{}{}", stem, addition)));
    if let Some(undoubled) = undouble_consonant(&stem) {
        out.extend(both_cases(&format!("{}{}", undoubled, addition)));
    }
    out
}

fn candidates_strip_plus(word: &str, n: usize, addition: &str) -> Vec<String> {
    both_cases(&format!("{}{}", strip(word, n), addition))
}

/// Tries an exact lookup, then case folds (upper/lower/title), then - for
/// pure-ASCII words - the ordered English suffix-stripping cascade from
/// `lib.cpp`. Returns the matched headword (which may differ from `word`)
/// together with its location.
pub fn lookup_similar(dict: &mut Single, word: &str) -> Option<(String, Location)> {
    if let Some((_, loc)) = dict.lookup(word) {
        return Some((word.to_string(), loc));
    }

    for variant in [word.to_uppercase(), word.to_lowercase(), titlecase::titlecase(word)] {
        if variant != word {
            if let Some((_, loc)) = dict.lookup(&variant) {
                return Some((variant, loc));
            }
        }
    }

    if !is_pure_english(word) {
        return None;
    }
    let lower = word.to_lowercase();
    let len = word.len();

    let rule_candidates: Vec<Vec<String>> = vec![
        if len >= 2 && lower.ends_with('s') {
            candidates_strip(word, 1)
        } else {
            vec![]
        },
        if len >= 2 && lower.ends_with("ed") {
            candidates_strip(word, 2)
        } else {
            vec![]
        },
        if len >= 3 && lower.ends_with("ly") {
            candidates_strip_doubled(word, 2)
        } else {
            vec![]
        },
        if len >= 4 && lower.ends_with("ing") {
            candidates_strip_doubled_plus(word, 3, "e")
        } else {
            vec![]
        },
        if len >= 4
            && lower.ends_with("es")
            && {
                let stem = &lower[..lower.len() - 2];
                stem.ends_with('s')
                    || stem.ends_with('x')
                    || stem.ends_with('o')
                    || stem.ends_with("ch")
                    || stem.ends_with("sh")
            }
        {
            candidates_strip(word, 2)
        } else {
            vec![]
        },
        if len >= 4 && lower.ends_with("ed") {
            candidates_strip_doubled(word, 2)
        } else {
            vec![]
        },
        if len >= 4 && lower.ends_with("ied") {
            candidates_strip_plus(word, 3, "y")
        } else {
            vec![]
        },
        if len >= 4 && lower.ends_with("ies") {
            candidates_strip_plus(word, 3, "y")
        } else {
            vec![]
        },
        if len >= 3 && lower.ends_with("er") {
            candidates_strip(word, 2)
        } else {
            vec![]
        },
        if len >= 4 && lower.ends_with("est") {
            candidates_strip(word, 3)
        } else {
            vec![]
        },
    ];

    for candidates in rule_candidates {
        for candidate in candidates {
            if let Some((_, loc)) = dict.lookup(&candidate) {
                return Some((candidate, loc));
            }
        }
    }

    None
}

/// Cross-dictionary similar-word aggregation: every loaded dictionary is
/// consulted, and all hits are merged into one deduplicated, order-preserving
/// list (the original's local-variable shadowing bug made this a no-op; see
/// `DESIGN.md`).
pub fn find_similar_words(set: &mut DictionarySet, word: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for dict in set.dictionaries_mut() {
        if let Some((candidate, _)) = lookup_similar(dict, word) {
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        }
    }
    out
}

/// A fuzzy match: a headword together with its bounded edit distance from
/// the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub distance: usize,
    pub word: String,
}

/// Bounded edit-distance fuzzy lookup over one dictionary. Returns up to `k`
/// matches, nearest first, every one with distance `< 3` (tightened further
/// as the result heap fills, per `lookupWithFuzzy`).
pub fn fuzzy_lookup(dict: &mut Single, query: &str, k: usize) -> Vec<FuzzyMatch> {
    let query = query.to_lowercase();
    let query_len = query.chars().count();
    let mut max_distance = 3usize;
    let mut heap: Vec<FuzzyMatch> = Vec::new();

    for i in 0..dict.article_count() {
        let headword = dict.key(i);
        let folded = headword.to_lowercase();
        let len_diff = (folded.chars().count() as i64 - query_len as i64).unsigned_abs() as usize;
        if len_diff >= max_distance {
            continue;
        }

        let distance = bounded_edit_distance(&query, &folded, max_distance);
        if distance < max_distance && distance < query_len {
            heap.push(FuzzyMatch {
                distance,
                word: headword,
            });
            heap.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
            if heap.len() > k {
                heap.truncate(k);
            }
            if heap.len() == k {
                max_distance = heap.last().unwrap().distance.max(1);
            }
        }
    }

    heap
}

/// Compiles a StarDict shell-glob pattern (`*`, `?`).
pub fn compile_glob(pattern: &str) -> Option<GlobMatcher> {
    Glob::new(pattern).ok().map(|g| g.compile_matcher())
}

/// Pattern lookup across every dictionary in the set: up to 100 matches per
/// dictionary, deduplicated and sorted by [`stardict_compare`].
pub fn glob_lookup(set: &mut DictionarySet, pattern: &str) -> Vec<String> {
    let Some(matcher) = compile_glob(pattern) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for dict in set.dictionaries_mut() {
        for word in dict.lookup_with_glob(&matcher, 100) {
            if seen.insert(word.clone()) {
                out.push(word);
            }
        }
    }
    out.sort_by(|a, b| stardict_compare(a.as_bytes(), b.as_bytes()));
    out
}

/// Splits a substring query on spaces, honoring backslash escapes for
/// `\ `, `\\`, `\t`, `\n`.
pub fn tokenize_data_query(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                let replaced = match next {
                    ' ' => ' ',
                    '\\' => '\\',
                    't' => '\t',
                    'n' => '\n',
                    other => other,
                };
                current.push(replaced);
                chars.next();
                continue;
            }
        }
        if c == ' ' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Substring ("data") lookup across every dictionary whose articles carry a
/// text field: every headword whose article contains all tokens.
pub fn data_lookup(set: &mut DictionarySet, query: &str) -> Vec<String> {
    let tokens = tokenize_data_query(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for dict in set.dictionaries_mut() {
        if let Ok(matches) = dict.find_data(&tokens) {
            for word in matches {
                if seen.insert(word.clone()) {
                    out.push(word);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_dictionary(dir: &std::path::Path, name: &str, words: &[&str]) {
        let ifo = format!(
            "StarDict's dict ifo file\nversion=2.4.2\nbookname={}\nwordcount={}\nidxfilesize=0\nsametypesequence=m\n",
            name,
            words.len()
        );
        fs::write(dir.join(format!("{}.ifo", name)), ifo).unwrap();

        let mut dict_body = Vec::new();
        let mut idx = Vec::new();
        for word in words {
            let offset = dict_body.len() as u32;
            let body = format!("article for {}", word);
            dict_body.extend_from_slice(body.as_bytes());
            idx.extend_from_slice(word.as_bytes());
            idx.push(0);
            idx.extend_from_slice(&offset.to_be_bytes());
            idx.extend_from_slice(&(body.len() as u32).to_be_bytes());
        }
        fs::write(dir.join(format!("{}.dict", name)), dict_body).unwrap();
        fs::write(dir.join(format!("{}.idx", name)), idx).unwrap();
    }

    #[test]
    fn similar_word_matches_plural_and_case() {
        let dir = tempdir().unwrap();
        write_dictionary(dir.path(), "d", &["running", "cat"]);
        let mut dict = Single::load(dir.path().join("d.ifo")).unwrap();

        assert_eq!(
            lookup_similar(&mut dict, "CAT").unwrap().0,
            "cat"
        );
        assert_eq!(
            lookup_similar(&mut dict, "runs").is_none(),
            true
        );
        assert_eq!(lookup_similar(&mut dict, "running").unwrap().0, "running");
    }

    #[test]
    fn fuzzy_lookup_respects_budget_and_distance() {
        let dir = tempdir().unwrap();
        write_dictionary(dir.path(), "d", &["cat", "car", "cart", "card", "dog"]);
        let mut dict = Single::load(dir.path().join("d.ifo")).unwrap();

        let matches = fuzzy_lookup(&mut dict, "caat", 3);
        assert!(matches.len() <= 3);
        assert!(matches.iter().all(|m| m.distance < 3));
        for pair in matches.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn glob_lookup_matches_and_sorts() {
        let dir = tempdir().unwrap();
        write_dictionary(dir.path(), "d", &["apple", "apply", "apricot", "banana"]);
        let policy = crate::set::LoadPolicy {
            directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let mut set = DictionarySet::load(&policy);
        let result = glob_lookup(&mut set, "ap*");
        assert_eq!(result, vec!["apple", "apply", "apricot"]);
    }

    #[test]
    fn find_similar_words_aggregates_across_dictionaries_without_shadowing() {
        let dir = tempdir().unwrap();
        // "one" only answers via the suffix cascade ("cats" -> "cat");
        // "two" answers via an exact hit on "cats" itself; "three" has
        // nothing relevant. A local-variable-shadowing bug (the original's
        // `core/dictionarymanager.cpp` no-op) would return an empty list
        // regardless of how many dictionaries actually matched.
        write_dictionary(dir.path(), "one", &["cat"]);
        write_dictionary(dir.path(), "two", &["cats"]);
        write_dictionary(dir.path(), "three", &["dog"]);

        let policy = crate::set::LoadPolicy {
            directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let mut set = DictionarySet::load(&policy);
        let mut matches = find_similar_words(&mut set, "cats");
        matches.sort();
        assert_eq!(matches, vec!["cat".to_string(), "cats".to_string()]);
    }

    #[test]
    fn find_similar_words_deduplicates_repeated_hits() {
        let dir = tempdir().unwrap();
        write_dictionary(dir.path(), "one", &["cat"]);
        write_dictionary(dir.path(), "two", &["cat"]);

        let policy = crate::set::LoadPolicy {
            directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let mut set = DictionarySet::load(&policy);
        assert_eq!(find_similar_words(&mut set, "cats"), vec!["cat".to_string()]);
    }

    mod fuzzy_budget_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(20))]
            #[test]
            fn fuzzy_lookup_never_exceeds_budget_or_distance(
                words in prop::collection::vec("[a-z]{3,8}", 1..12),
                query in "[a-z]{3,8}",
                k in 1usize..6,
            ) {
                let dir = tempdir().unwrap();
                let refs: Vec<&str> = words.iter().map(|s| s.as_str()).collect();
                write_dictionary(dir.path(), "d", &refs);
                let mut dict = Single::load(dir.path().join("d.ifo")).unwrap();

                let matches = fuzzy_lookup(&mut dict, &query, k);
                prop_assert!(matches.len() <= k);
                prop_assert!(matches.iter().all(|m| m.distance < 3));
                for pair in matches.windows(2) {
                    prop_assert!(
                        pair[0].distance < pair[1].distance
                            || (pair[0].distance == pair[1].distance && pair[0].word <= pair[1].word)
                    );
                }
            }
        }
    }

    #[test]
    fn data_lookup_requires_all_tokens() {
        let dir = tempdir().unwrap();
        write_dictionary(dir.path(), "d", &["x"]);
        let policy = crate::set::LoadPolicy {
            directories: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let mut set = DictionarySet::load(&policy);
        let hits = data_lookup(&mut set, "article x");
        assert_eq!(hits, vec!["x"]);
        let hits = data_lookup(&mut set, "article missing");
        assert!(hits.is_empty());
    }
}
