//! The dictionary set: directory scanning, load/reload policy, and
//! cross-dictionary headword enumeration. Grounded on
//! `stardictdictionarymanager.cpp`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::dictionary::Single;
use crate::index::stardict_compare;

/// The directory/order/disable triple every load or reload is driven by.
#[derive(Debug, Clone, Default)]
pub struct LoadPolicy {
    /// Directories recursively scanned for `.ifo` files.
    pub directories: Vec<PathBuf>,
    /// `.ifo` paths loaded first, in this order, ahead of the directory scan.
    pub order: Vec<PathBuf>,
    /// `.ifo` paths never loaded, even if named in `order` or found by the
    /// directory scan.
    pub disabled: Vec<PathBuf>,
}

/// A cursor over the sorted union of headwords across every dictionary in a
/// set. `None` means "not yet positioned" (forward) or "positioned one past
/// the last entry" (backward), matching the `-1`/`article_count` sentinels
/// of the original index.
pub type Cursor = Vec<Option<u64>>;

/// An ordered collection of loaded dictionaries.
pub struct DictionarySet {
    dictionaries: Vec<Single>,
}

impl DictionarySet {
    /// Loads a fresh set: `order` first, then a recursive scan of
    /// `directories`, skipping anything in `disabled` or already loaded.
    /// Dictionaries that fail to load are skipped with a logged warning;
    /// a partial failure never aborts the whole load.
    pub fn load(policy: &LoadPolicy) -> Self {
        let mut dictionaries = Vec::new();
        let mut seen = HashSet::new();

        for path in &policy.order {
            if policy.disabled.contains(path) {
                continue;
            }
            load_one(path.clone(), &mut dictionaries, &mut seen);
        }

        for dir in &policy.directories {
            for ifo_path in find_ifo_files(dir) {
                if policy.disabled.contains(&ifo_path) || policy.order.contains(&ifo_path) {
                    continue;
                }
                load_one(ifo_path, &mut dictionaries, &mut seen);
            }
        }

        Self { dictionaries }
    }

    /// Rebuilds the set under a (possibly changed) policy, re-using already
    /// loaded instances whose `.ifo` path is still wanted, and dropping
    /// whatever is no longer referenced. Grounded on the non-buggy
    /// `reload()` in `stardictdictionarymanager.cpp`: snapshot the current
    /// instances, rebuild via the same traversal, and only load anew what
    /// wasn't already present.
    pub fn reload(self, policy: &LoadPolicy) -> Self {
        let mut previous: HashMap<PathBuf, Single> = self
            .dictionaries
            .into_iter()
            .map(|d| (d.ifo_path().to_path_buf(), d))
            .collect();

        let mut dictionaries = Vec::new();
        let mut seen = HashSet::new();

        for path in &policy.order {
            if policy.disabled.contains(path) {
                continue;
            }
            reuse_or_load(path.clone(), &mut dictionaries, &mut seen, &mut previous);
        }

        for dir in &policy.directories {
            for ifo_path in find_ifo_files(dir) {
                if policy.disabled.contains(&ifo_path) || policy.order.contains(&ifo_path) {
                    continue;
                }
                reuse_or_load(ifo_path, &mut dictionaries, &mut seen, &mut previous);
            }
        }

        for path in previous.keys() {
            log::debug!("dropping dictionary no longer referenced: {:?}", path);
        }

        Self { dictionaries }
    }

    pub fn dictionaries(&self) -> &[Single] {
        &self.dictionaries
    }

    pub fn dictionaries_mut(&mut self) -> &mut [Single] {
        &mut self.dictionaries
    }

    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }

    pub fn new_cursor(&self) -> Cursor {
        vec![None; self.dictionaries.len()]
    }

    /// The smallest headword among the cursor's current positions, without
    /// advancing anything.
    pub fn current_word(&mut self, cursor: &Cursor) -> Option<String> {
        let mut best: Option<String> = None;
        for (i, pos) in cursor.iter().enumerate() {
            if let Some(idx) = pos {
                if *idx < self.dictionaries[i].article_count() {
                    let key = self.dictionaries[i].key(*idx);
                    if best
                        .as_ref()
                        .map_or(true, |b| stardict_compare(key.as_bytes(), b.as_bytes()) == Ordering::Less)
                    {
                        best = Some(key);
                    }
                }
            }
        }
        best
    }

    /// Advances `cursor` to the next distinct headword in the sorted union
    /// across all dictionaries, returning it, or `None` once every
    /// dictionary is exhausted. If `word` is given, every cursor is first
    /// repositioned via a per-dictionary `lookup` to seed enumeration
    /// starting at (or just after, for a miss) that word, per `po_next_word`.
    pub fn next_word(&mut self, word: Option<&str>, cursor: &mut Cursor) -> Option<String> {
        match word {
            Some(w) => {
                for (i, pos) in cursor.iter_mut().enumerate() {
                    *pos = Some(self.dictionaries[i].locate(w));
                }
            }
            None => {
                for (i, pos) in cursor.iter_mut().enumerate() {
                    if pos.is_none() && self.dictionaries[i].article_count() > 0 {
                        *pos = Some(0);
                    }
                }
            }
        }

        let word = self.current_word(cursor)?;

        for (i, pos) in cursor.iter_mut().enumerate() {
            if let Some(idx) = pos {
                if *idx < self.dictionaries[i].article_count()
                    && self.dictionaries[i].key(*idx) == word
                {
                    *pos = Some(*idx + 1);
                }
            }
        }

        Some(word)
    }

    /// Symmetric, backward counterpart of [`next_word`](Self::next_word),
    /// including the same `word` seek parameter: each cursor is repositioned
    /// just past `word`'s per-dictionary position so the first step back
    /// considers that position itself.
    pub fn previous_word(&mut self, word: Option<&str>, cursor: &mut Cursor) -> Option<String> {
        match word {
            Some(w) => {
                for (i, pos) in cursor.iter_mut().enumerate() {
                    *pos = Some(self.dictionaries[i].locate(w) + 1);
                }
            }
            None => {
                for (i, pos) in cursor.iter_mut().enumerate() {
                    if pos.is_none() {
                        *pos = Some(self.dictionaries[i].article_count());
                    }
                }
            }
        }

        let mut best: Option<String> = None;
        for (i, pos) in cursor.iter().enumerate() {
            if let Some(idx) = pos {
                if *idx > 0 {
                    let key = self.dictionaries[i].key(*idx - 1);
                    if best
                        .as_ref()
                        .map_or(true, |b| stardict_compare(key.as_bytes(), b.as_bytes()) == Ordering::Greater)
                    {
                        best = Some(key);
                    }
                }
            }
        }
        let word = best?;

        for (i, pos) in cursor.iter_mut().enumerate() {
            if let Some(idx) = pos {
                if *idx > 0 && self.dictionaries[i].key(*idx - 1) == word {
                    *pos = Some(*idx - 1);
                }
            }
        }

        Some(word)
    }
}

fn find_ifo_files(dir: &std::path::Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "ifo"))
        .collect()
}

fn load_one(path: PathBuf, dictionaries: &mut Vec<Single>, seen: &mut HashSet<PathBuf>) {
    if !seen.insert(path.clone()) {
        return;
    }
    match Single::load(path.clone()) {
        Ok(dict) => dictionaries.push(dict),
        Err(e) => log::warn!("failed to load dictionary {:?}: {}", path, e),
    }
}

fn reuse_or_load(
    path: PathBuf,
    dictionaries: &mut Vec<Single>,
    seen: &mut HashSet<PathBuf>,
    previous: &mut HashMap<PathBuf, Single>,
) {
    if !seen.insert(path.clone()) {
        return;
    }
    if let Some(existing) = previous.remove(&path) {
        dictionaries.push(existing);
        return;
    }
    match Single::load(path.clone()) {
        Ok(dict) => dictionaries.push(dict),
        Err(e) => log::warn!("failed to load dictionary {:?}: {}", path, e),
    }
}
