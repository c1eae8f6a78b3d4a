//! StarDict's paged `.idx` offset index.
//!
//! Entries are `headword \0 offset size`, stored in ascending order under
//! [`stardict_compare`]. The index is logically divided into 32-entry pages;
//! a page-offset table (the byte offset where each page starts) is computed
//! once and persisted next to the `.idx` file so later opens don't have to
//! rescan it. Grounded on `offsetindex.cpp`.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use filetime::FileTime;
use globset::GlobMatcher;
use memmap2::Mmap;

use crate::error::DictError;

pub const ENTRIES_PER_PAGE: usize = 32;
const CACHE_MAGIC: &[u8] = b"StarDict's Cache, Version: 0.1";

/// A byte range inside a dictionary's logical (uncompressed) article stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: u64,
    pub size: u64,
}

/// Case-insensitive-ASCII-primary, exact-bytewise-tiebreak collation used
/// throughout StarDict. Non-ASCII bytes participate in both passes as plain
/// byte values, so they effectively only affect the tiebreak.
pub fn stardict_compare(a: &[u8], b: &[u8]) -> Ordering {
    fn fold(b: u8) -> u8 {
        if b.is_ascii_uppercase() {
            b.to_ascii_lowercase()
        } else {
            b
        }
    }

    let primary = a
        .iter()
        .map(|&b| fold(b))
        .cmp(b.iter().map(|&b| fold(b)));

    if primary != Ordering::Equal {
        primary
    } else {
        a.cmp(b)
    }
}

struct Entry {
    key: String,
    offset: u64,
    size: u64,
}

enum Backing {
    Mmap(Mmap),
    Bytes(Vec<u8>),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Mmap(m) => &m[..],
            Backing::Bytes(b) => &b[..],
        }
    }
}

/// The paged offset index for one dictionary.
pub struct Index {
    data: Backing,
    wordcount: u64,
    offset_bytes: usize,
    page_starts: Vec<u64>,
    loaded_page: Option<(usize, Vec<Entry>)>,
}

impl Index {
    /// Opens (and, if necessary, rebuilds) the index for an `.idx` file at
    /// `idx_path` holding `wordcount` entries whose offsets are `offset_bits`
    /// wide (32 or 64).
    pub fn open(idx_path: &Path, wordcount: u64, offset_bits: u32) -> Result<Self, DictError> {
        let file = File::open(idx_path)?;
        let data = match unsafe { Mmap::map(&file) } {
            Ok(m) => Backing::Mmap(m),
            Err(_) => {
                let mut bytes = Vec::new();
                File::open(idx_path)?.read_to_end(&mut bytes)?;
                Backing::Bytes(bytes)
            }
        };
        let offset_bytes = (offset_bits / 8) as usize;

        let page_starts = match load_cache(idx_path, &file, wordcount) {
            Some(starts) => starts,
            None => {
                let starts = scan_page_starts(data.as_slice(), wordcount, offset_bytes)?;
                save_cache(idx_path, &starts);
                starts
            }
        };

        Ok(Self {
            data,
            wordcount,
            offset_bytes,
            page_starts,
            loaded_page: None,
        })
    }

    pub fn word_count(&self) -> u64 {
        self.wordcount
    }

    fn num_pages(&self) -> usize {
        self.page_starts.len() - 1
    }

    fn parse_entry(&self, pos: u64) -> Entry {
        let data = self.data.as_slice();
        let pos = pos as usize;
        let nul = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .expect("index entry must be nul-terminated");
        let key = String::from_utf8_lossy(&data[pos..pos + nul]).into_owned();
        let after_key = pos + nul + 1;
        let offset = if self.offset_bytes == 8 {
            BigEndian::read_u64(&data[after_key..after_key + 8])
        } else {
            BigEndian::read_u32(&data[after_key..after_key + 4]) as u64
        };
        let size_pos = after_key + self.offset_bytes;
        let size = BigEndian::read_u32(&data[size_pos..size_pos + 4]) as u64;
        Entry { key, offset, size }
    }

    fn entry_len(&self, key_len: usize) -> u64 {
        (key_len + 1 + self.offset_bytes + 4) as u64
    }

    fn ensure_page(&mut self, page: usize) {
        if matches!(&self.loaded_page, Some((p, _)) if *p == page) {
            return;
        }
        let start = self.page_starts[page];
        let end = self.page_starts[page + 1];
        let mut entries = Vec::with_capacity(ENTRIES_PER_PAGE);
        let mut pos = start;
        while pos < end {
            let entry = self.parse_entry(pos);
            pos += self.entry_len(entry.key.len());
            entries.push(entry);
        }
        self.loaded_page = Some((page, entries));
    }

    fn page_entries(&mut self, page: usize) -> &[Entry] {
        self.ensure_page(page);
        &self.loaded_page.as_ref().unwrap().1
    }

    fn first_key_of_page(&mut self, page: usize) -> String {
        self.page_entries(page)[0].key.clone()
    }

    /// Returns the headword and `Location` at global index `i`.
    pub fn key(&mut self, i: u64) -> (String, Location) {
        let page = (i as usize) / ENTRIES_PER_PAGE;
        let slot = (i as usize) % ENTRIES_PER_PAGE;
        self.ensure_page(page);
        let entry = &self.loaded_page.as_ref().unwrap().1[slot];
        (
            entry.key.clone(),
            Location {
                offset: entry.offset,
                size: entry.size,
            },
        )
    }

    /// Two-level binary search: first locate the page whose key range could
    /// contain `word`, then binary-search within that page.
    pub fn lookup(&mut self, word: &str) -> (bool, u64) {
        if self.wordcount == 0 {
            return (false, 0);
        }

        let num_pages = self.num_pages();
        let mut lo = 0usize;
        let mut hi = num_pages - 1;
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            let first = self.first_key_of_page(mid);
            if stardict_compare(first.as_bytes(), word.as_bytes()) != Ordering::Greater {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        let page = lo;

        let entries = self.page_entries(page);
        let base = page * ENTRIES_PER_PAGE;
        match entries.binary_search_by(|e| stardict_compare(e.key.as_bytes(), word.as_bytes())) {
            Ok(slot) => (true, (base + slot) as u64),
            Err(slot) => (false, (base + slot) as u64),
        }
    }

    /// Linear scan matching a shell-style glob (`*`, `?`) against every
    /// headword, returning up to `budget` matching global indices in
    /// ascending order.
    pub fn lookup_with_glob(&mut self, matcher: &GlobMatcher, budget: usize) -> Vec<u64> {
        let mut out = Vec::new();
        for i in 0..self.wordcount {
            let (key, _) = self.key(i);
            if matcher.is_match(&key) {
                out.push(i);
                if out.len() >= budget {
                    break;
                }
            }
        }
        out
    }
}

fn find_nul(data: &[u8], from: u64) -> u64 {
    let pos = from as usize;
    let offset = data[pos..]
        .iter()
        .position(|&b| b == 0)
        .expect("index entry must be nul-terminated");
    (pos + offset) as u64
}

fn scan_page_starts(data: &[u8], wordcount: u64, offset_bytes: usize) -> Result<Vec<u64>, DictError> {
    let mut starts = Vec::with_capacity((wordcount as usize / ENTRIES_PER_PAGE) + 2);
    let mut pos = 0u64;
    let mut count = 0u64;
    while count < wordcount {
        if count % ENTRIES_PER_PAGE as u64 == 0 {
            starts.push(pos);
        }
        if pos as usize >= data.len() {
            return Err(DictError::CorruptArchive(
                "index file ended before wordcount entries were read".into(),
            ));
        }
        let nul = find_nul(data, pos);
        let key_len = (nul - pos) as usize;
        pos = nul + 1 + offset_bytes as u64 + 4;
        count += 1;
    }
    starts.push(pos);
    Ok(starts)
}

fn cache_sibling_path(idx_path: &Path) -> PathBuf {
    let mut s = idx_path.as_os_str().to_owned();
    s.push(".oft");
    PathBuf::from(s)
}

fn xdg_cache_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("XDG_CACHE_HOME") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    std::env::var("HOME").ok().map(|home| Path::new(&home).join(".cache"))
}

fn cache_fallback_path(idx_path: &Path) -> Option<PathBuf> {
    let basename = idx_path.file_name()?;
    xdg_cache_dir().map(|dir| dir.join("sdcv").join(basename))
}

fn load_cache(idx_path: &Path, idx_file: &File, wordcount: u64) -> Option<Vec<u64>> {
    let idx_mtime = FileTime::from_last_modification_time(&idx_file.metadata().ok()?);
    let expected_len = CACHE_MAGIC.len() + 8 * (wordcount as usize / ENTRIES_PER_PAGE + 2);

    for candidate in [cache_sibling_path(idx_path), cache_fallback_path(idx_path)?] {
        if let Ok(meta) = fs::metadata(&candidate) {
            let cache_mtime = FileTime::from_last_modification_time(&meta);
            if cache_mtime < idx_mtime {
                continue;
            }
            if let Ok(bytes) = fs::read(&candidate) {
                if bytes.len() >= CACHE_MAGIC.len()
                    && &bytes[..CACHE_MAGIC.len()] == CACHE_MAGIC
                    && bytes.len() <= expected_len
                {
                    let body = &bytes[CACHE_MAGIC.len()..];
                    let starts: Vec<u64> = body.chunks_exact(8).map(LittleEndian::read_u64).collect();
                    if starts.len() >= 2 {
                        return Some(starts);
                    }
                }
            }
        }
    }
    None
}

fn save_cache(idx_path: &Path, starts: &[u64]) {
    let mut body = Vec::with_capacity(CACHE_MAGIC.len() + 8 * starts.len());
    body.extend_from_slice(CACHE_MAGIC);
    for &s in starts {
        body.extend_from_slice(&s.to_le_bytes());
    }

    if write_cache_file(&cache_sibling_path(idx_path), &body).is_ok() {
        return;
    }
    if let Some(fallback) = cache_fallback_path(idx_path) {
        if let Some(parent) = fallback.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = write_cache_file(&fallback, &body) {
            log::warn!("failed to persist offset cache for {:?}: {}", idx_path, e);
        }
    }
}

fn write_cache_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(body)
}
