//! End-to-end scenarios exercising the public surface: load a dictionary
//! (or a set of them) from a throwaway directory and drive it the way a
//! caller would, through `backend::StarDictBackend` and `query`/`dispatch`.

use std::fs;
use std::path::Path;

use stardict::backend::{Backend, StarDictBackend};
use stardict::dispatch::{dispatch, DispatchResult};
use stardict::query;
use stardict::set::{DictionarySet, LoadPolicy};
use stardict::Single;
use tempfile::tempdir;

fn write_dictionary(dir: &Path, name: &str, entries: &[(&str, &str)]) {
    let ifo = format!(
        "StarDict's dict ifo file\nversion=2.4.2\nbookname={}\nwordcount={}\nidxfilesize=0\nsametypesequence=m\n",
        name,
        entries.len()
    );
    fs::write(dir.join(format!("{}.ifo", name)), ifo).unwrap();

    let mut dict_body = Vec::new();
    let mut idx = Vec::new();
    for (word, body) in entries {
        let offset = dict_body.len() as u32;
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
fn scenario_single_entry_case_insensitive_translate() {
    let dir = tempdir().unwrap();
    write_dictionary(dir.path(), "Greeting", &[("hello", "greeting")]);
    let mut backend = StarDictBackend::new(vec![dir.path().to_path_buf()]);

    let lower = backend.translate("Greeting", "hello").unwrap();
    assert!(lower.body.contains("greeting"));

    let upper = backend.translate("Greeting", "HELLO").unwrap();
    assert!(upper.body.contains("greeting"));
}

#[test]
fn scenario_suffix_stripping_cascade() {
    let dir = tempdir().unwrap();
    write_dictionary(dir.path(), "Verbs", &[("running", "to run")]);
    let mut backend = StarDictBackend::new(vec![dir.path().to_path_buf()]);

    assert!(backend.translate("Verbs", "ran").is_err());

    let stripped = backend.translate("Verbs", "runs").unwrap();
    assert_eq!(stripped.word, "running");

    let direct = backend.translate("Verbs", "running").unwrap();
    assert_eq!(direct.word, "running");
}

#[test]
fn scenario_fuzzy_lookup_orders_by_distance_then_headword() {
    let dir = tempdir().unwrap();
    write_dictionary(
        dir.path(),
        "Cars",
        &[
            ("cat", "a cat"),
            ("car", "a car"),
            ("cart", "a cart"),
            ("card", "a card"),
        ],
    );
    let mut dict = Single::load(dir.path().join("Cars.ifo")).unwrap();

    let matches = query::fuzzy_lookup(&mut dict, "caat", 3);
    let words: Vec<(&str, usize)> = matches.iter().map(|m| (m.word.as_str(), m.distance)).collect();
    assert_eq!(words, vec![("cat", 1), ("car", 2), ("cart", 2)]);
}

#[test]
fn scenario_glob_pattern_lookup_is_sorted_and_deduplicated() {
    let dir = tempdir().unwrap();
    write_dictionary(
        dir.path(),
        "Fruit",
        &[
            ("apple", "a fruit"),
            ("apply", "a verb"),
            ("apricot", "a fruit"),
            ("banana", "a fruit"),
        ],
    );
    let policy = LoadPolicy {
        directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    let mut set = DictionarySet::load(&policy);

    match dispatch(&mut set, "ap*") {
        DispatchResult::Glob(words) => {
            assert_eq!(words, vec!["apple", "apply", "apricot"]);
        }
        other => panic!("expected a glob dispatch result, got {:?}", other),
    }
}

#[test]
fn scenario_substring_query_over_dispatcher() {
    let dir = tempdir().unwrap();
    write_dictionary(dir.path(), "Notes", &[("entry", "a foo and a bar")]);
    let policy = LoadPolicy {
        directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    let mut set = DictionarySet::load(&policy);

    match dispatch(&mut set, "|foo bar") {
        DispatchResult::Data(words) => assert_eq!(words, vec!["entry"]),
        other => panic!("expected a data dispatch result, got {:?}", other),
    }

    match dispatch(&mut set, "|foo baz") {
        DispatchResult::Data(words) => assert!(words.is_empty()),
        other => panic!("expected a data dispatch result, got {:?}", other),
    }
}

#[test]
fn scenario_reload_drops_removed_dictionary_preserving_identity() {
    let dir = tempdir().unwrap();
    write_dictionary(dir.path(), "one", &[("a", "first")]);
    write_dictionary(dir.path(), "two", &[("b", "second")]);

    let policy = LoadPolicy {
        directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };
    let set = DictionarySet::load(&policy);
    assert_eq!(set.len(), 2);
    let original_ifo_path = set.dictionaries()[0].ifo_path().to_path_buf();

    fs::remove_file(dir.path().join("two.ifo")).unwrap();
    let set = set.reload(&policy);

    assert_eq!(set.len(), 1);
    assert_eq!(set.dictionaries()[0].ifo_path(), original_ifo_path);
}
