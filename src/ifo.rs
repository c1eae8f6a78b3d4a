//! Parser for StarDict's `.ifo` metadata file.
//!
//! The file is a small line-oriented text format: a fixed magic line,
//! followed by `key=value` lines. See `stardictdictionaryinfo.cpp` in the
//! original source for the field list this is modeled on.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::DictError;

const MAGIC_DICT: &str = "StarDict's dict ifo file";

/// Parsed `.ifo` metadata.
#[derive(Debug, Clone)]
pub struct IfoMetadata {
    pub bookname: String,
    pub wordcount: u64,
    pub idxfilesize: u64,
    pub author: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    /// Ordered list of field-type characters shared by every article. Empty
    /// when absent, meaning every article carries its own type tags.
    pub sametypesequence: String,
    /// Width, in bits, of the offsets stored in the `.idx` file. 32 or 64.
    pub idxoffsetbits: u32,
}

impl IfoMetadata {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, DictError> {
        let mut lines = text.lines();

        let magic = lines
            .next()
            .ok_or_else(|| DictError::InvalidIfo("empty .ifo file".into()))?;
        if !magic.starts_with(MAGIC_DICT) {
            return Err(DictError::InvalidIfo(format!(
                "unrecognized magic line: {:?}",
                magic
            )));
        }

        let mut fields: HashMap<&str, &str> = HashMap::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    fields.insert(key, value);
                }
                None => continue,
            }
        }

        let bookname = fields
            .get("bookname")
            .ok_or_else(|| DictError::InvalidIfo("missing bookname".into()))?
            .to_string();
        let wordcount = fields
            .get("wordcount")
            .ok_or_else(|| DictError::InvalidIfo("missing wordcount".into()))?
            .parse()
            .map_err(|_| DictError::InvalidIfo("wordcount is not a number".into()))?;
        let idxfilesize = fields
            .get("idxfilesize")
            .ok_or_else(|| DictError::InvalidIfo("missing idxfilesize".into()))?
            .parse()
            .map_err(|_| DictError::InvalidIfo("idxfilesize is not a number".into()))?;

        let idxoffsetbits = match fields.get("idxoffsetbits") {
            Some(v) => v
                .parse()
                .map_err(|_| DictError::InvalidIfo("idxoffsetbits is not a number".into()))?,
            None => 32,
        };
        if idxoffsetbits != 32 && idxoffsetbits != 64 {
            return Err(DictError::UnsupportedVersion(format!(
                "idxoffsetbits={}",
                idxoffsetbits
            )));
        }

        Ok(IfoMetadata {
            bookname,
            wordcount,
            idxfilesize,
            author: fields.get("author").map(|s| s.to_string()),
            email: fields.get("email").map(|s| s.to_string()),
            website: fields.get("website").map(|s| s.to_string()),
            date: fields.get("date").map(|s| s.to_string()),
            description: fields.get("description").map(|s| s.to_string()),
            sametypesequence: fields
                .get("sametypesequence")
                .map(|s| s.to_string())
                .unwrap_or_default(),
            idxoffsetbits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "StarDict's dict ifo file\nversion=2.4.2\nbookname=Test Dictionary\nwordcount=3\nidxfilesize=42\nsametypesequence=m\n";

    #[test]
    fn parses_required_and_optional_fields() {
        let meta = IfoMetadata::parse(SAMPLE).unwrap();
        assert_eq!(meta.bookname, "Test Dictionary");
        assert_eq!(meta.wordcount, 3);
        assert_eq!(meta.idxfilesize, 42);
        assert_eq!(meta.sametypesequence, "m");
        assert_eq!(meta.idxoffsetbits, 32);
    }

    #[test]
    fn rejects_missing_magic() {
        let err = IfoMetadata::parse("not an ifo file\n").unwrap_err();
        assert!(matches!(err, DictError::InvalidIfo(_)));
    }

    #[test]
    fn rejects_missing_required_field() {
        let text = "StarDict's dict ifo file\nversion=2.4.2\nbookname=X\n";
        let err = IfoMetadata::parse(text).unwrap_err();
        assert!(matches!(err, DictError::InvalidIfo(_)));
    }

    #[test]
    fn rejects_unsupported_offset_width() {
        let text = format!("{}idxoffsetbits=16\n", SAMPLE);
        let err = IfoMetadata::parse(&text).unwrap_err();
        assert!(matches!(err, DictError::UnsupportedVersion(_)));
    }
}
