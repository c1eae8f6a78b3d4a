//! A single loaded StarDict dictionary: `.ifo` metadata + paged index +
//! article reader, bound together. Grounded on `dictionarybase.cpp`'s
//! public surface (`wordCount`, `key`, `wordData`, lookup helpers).

use std::fs::File;
use std::path::{Path, PathBuf};

use globset::GlobMatcher;

use crate::article::{self, ArticleCache};
use crate::dictzip::{self, DictZip, Kind};
use crate::error::DictError;
use crate::ifo::IfoMetadata;
use crate::index::{Index, Location};
use crate::reader::DictReader;
use crate::uncompressed::Uncompressed;

const ARTICLE_CACHE_SIZE: usize = 10;

fn open_reader(path: &Path) -> Result<Box<dyn DictReader>, DictError> {
    let mut file = File::open(path)?;
    match dictzip::classify(&mut file)? {
        Kind::Plain => Ok(Box::new(Uncompressed::new(file)?)),
        Kind::DictZip => Ok(Box::new(DictZip::new(file)?)),
        Kind::Gzip => Err(DictError::NotRandomAccessible),
    }
}

/// One loaded StarDict dictionary.
pub struct Single {
    ifo_path: PathBuf,
    meta: IfoMetadata,
    index: Index,
    reader: Box<dyn DictReader>,
    cache: ArticleCache,
}

impl Single {
    /// Loads a dictionary given the path to its `.ifo` file. The companion
    /// `.dict`/`.dict.dz` and `.idx` files are located next to it, preferring
    /// the compressed variant when both exist.
    pub fn load(ifo_path: impl Into<PathBuf>) -> Result<Self, DictError> {
        let ifo_path = ifo_path.into();
        let meta = IfoMetadata::load(&ifo_path)?;
        if meta.wordcount == 0 {
            return Err(DictError::InvalidIfo("wordcount is zero".into()));
        }

        let base = ifo_path.with_extension("");
        let base_str = base.display().to_string();
        let dict_dz_path = PathBuf::from(format!("{}.dict.dz", base_str));
        let dict_path = PathBuf::from(format!("{}.dict", base_str));
        let idx_path = PathBuf::from(format!("{}.idx", base_str));
        let idx_gz_path = PathBuf::from(format!("{}.idx.gz", base_str));

        if !idx_path.exists() {
            if idx_gz_path.exists() {
                return Err(DictError::UnsupportedVersion(
                    "gzipped .idx files are not implemented".into(),
                ));
            }
            return Err(DictError::CorruptArchive(format!(
                "missing index file: {:?}",
                idx_path
            )));
        }

        let reader = if dict_dz_path.exists() {
            open_reader(&dict_dz_path)?
        } else if dict_path.exists() {
            open_reader(&dict_path)?
        } else {
            return Err(DictError::CorruptArchive(format!(
                "missing article file next to {:?}",
                ifo_path
            )));
        };

        let index = Index::open(&idx_path, meta.wordcount, meta.idxoffsetbits)?;

        Ok(Self {
            ifo_path,
            meta,
            index,
            reader,
            cache: ArticleCache::new(ARTICLE_CACHE_SIZE),
        })
    }

    pub fn ifo_path(&self) -> &Path {
        &self.ifo_path
    }

    pub fn name(&self) -> &str {
        &self.meta.bookname
    }

    pub fn metadata(&self) -> &IfoMetadata {
        &self.meta
    }

    pub fn article_count(&self) -> u64 {
        self.meta.wordcount
    }

    /// The headword at global index `i`.
    pub fn key(&mut self, i: u64) -> String {
        self.index.key(i).0
    }

    /// The fully tagged article body at global index `i`.
    pub fn data(&mut self, i: u64) -> Result<Vec<u8>, DictError> {
        let (_, loc) = self.index.key(i);
        self.data_at(loc)
    }

    fn data_at(&mut self, loc: Location) -> Result<Vec<u8>, DictError> {
        if let Some(cached) = self.cache.get(loc.offset) {
            return Ok(cached.to_vec());
        }
        let raw = self.reader.fetch(loc)?;
        let tagged = article::reconstruct(&raw, &self.meta.sametypesequence)?;
        self.cache.insert(loc.offset, tagged.clone());
        Ok(tagged)
    }

    /// Exact lookup. Returns the matching global index and article body
    /// location, or `None` on a miss.
    pub fn lookup(&mut self, word: &str) -> Option<(u64, Location)> {
        let (found, idx) = self.index.lookup(word);
        if found {
            let (_, loc) = self.index.key(idx);
            Some((idx, loc))
        } else {
            None
        }
    }

    /// `word`'s position: its exact index if present, otherwise the index
    /// it would be inserted at (possibly `article_count()`, "past end").
    /// Used to seed enumeration cursors at a given starting word.
    pub fn locate(&mut self, word: &str) -> u64 {
        self.index.lookup(word).1
    }

    pub fn lookup_with_glob(&mut self, matcher: &GlobMatcher, budget: usize) -> Vec<String> {
        self.index
            .lookup_with_glob(matcher, budget)
            .into_iter()
            .map(|i| self.index.key(i).0)
            .collect()
    }

    pub fn contains_find_data(&self) -> bool {
        article::contains_find_data(&self.meta.sametypesequence)
    }

    /// Substring ("data") search: returns every headword whose article
    /// contains all of `needles` in some text field.
    pub fn find_data(&mut self, needles: &[String]) -> Result<Vec<String>, DictError> {
        let mut out = Vec::new();
        if !self.contains_find_data() {
            return Ok(out);
        }
        for i in 0..self.article_count() {
            let (key, loc) = self.index.key(i);
            let raw = self.reader.fetch(loc)?;
            let tagged = article::reconstruct(&raw, &self.meta.sametypesequence)?;
            if article::find_data(&tagged, needles)? {
                out.push(key);
            }
        }
        Ok(out)
    }

    /// Every headword in ascending order. Used by dictionary-set
    /// enumeration cursors.
    pub fn all_keys(&mut self) -> Vec<String> {
        (0..self.article_count()).map(|i| self.key(i)).collect()
    }
}
