//! Article-body decoding.
//!
//! An article as read straight off disk is, when `sametypesequence` is
//! empty, already a sequence of `(type_char, payload)` pairs. When
//! `sametypesequence` is set, the type tags (and the last field's length)
//! are omitted to save space; [`reconstruct`] expands either form into the
//! full tagged form so downstream code (the renderer, `find_data`) only
//! needs to understand one shape. Grounded on `dictionarybase.cpp`'s
//! `wordData`/`containFindData`/`findData`.

use byteorder::{BigEndian, ByteOrder};

use crate::error::DictError;

/// One decoded field of an article body.
pub struct Field<'a> {
    pub kind: u8,
    pub payload: &'a [u8],
}

/// `true` for the lowercase type characters whose payload is `\0`-terminated
/// text; `false` for the uppercase types whose payload is length-prefixed.
fn is_text_type(kind: u8) -> bool {
    kind.is_ascii_lowercase()
}

/// Expands a raw article body into its fully tagged form: `(type_char,
/// payload)` pairs, each lowercase payload still `\0`-terminated and each
/// uppercase payload still carrying its length prefix. A no-op when
/// `sametypesequence` is empty - the stored bytes are already in this shape.
pub fn reconstruct(raw: &[u8], sametypesequence: &str) -> Result<Vec<u8>, DictError> {
    if sametypesequence.is_empty() {
        return Ok(raw.to_vec());
    }

    let types: Vec<u8> = sametypesequence.bytes().collect();
    let mut out = Vec::with_capacity(raw.len() + types.len() * 5);
    let mut pos = 0usize;

    for (i, &kind) in types.iter().enumerate() {
        let is_last = i == types.len() - 1;
        out.push(kind);

        if is_last {
            let remaining = &raw[pos..];
            if is_text_type(kind) {
                out.extend_from_slice(remaining);
                out.push(0);
            } else {
                let mut len_buf = [0u8; 4];
                BigEndian::write_u32(&mut len_buf, remaining.len() as u32);
                out.extend_from_slice(&len_buf);
                out.extend_from_slice(remaining);
            }
            pos = raw.len();
        } else if is_text_type(kind) {
            let nul = raw[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| DictError::CorruptArchive("unterminated text field".into()))?;
            out.extend_from_slice(&raw[pos..pos + nul + 1]);
            pos += nul + 1;
        } else {
            if raw.len() < pos + 4 {
                return Err(DictError::CorruptArchive("truncated length-prefixed field".into()));
            }
            let len = BigEndian::read_u32(&raw[pos..pos + 4]) as usize;
            let end = pos + 4 + len;
            if raw.len() < end {
                return Err(DictError::CorruptArchive("truncated length-prefixed field".into()));
            }
            out.extend_from_slice(&raw[pos..end]);
            pos = end;
        }
    }

    Ok(out)
}

/// Iterates the fields of an already-fully-tagged article body.
pub fn fields(tagged: &[u8]) -> Result<Vec<Field<'_>>, DictError> {
    let mut fields = Vec::new();
    let mut pos = 0usize;

    while pos < tagged.len() {
        let kind = tagged[pos];
        pos += 1;

        if is_text_type(kind) {
            let nul = tagged[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| DictError::CorruptArchive("unterminated text field".into()))?;
            fields.push(Field {
                kind,
                payload: &tagged[pos..pos + nul],
            });
            pos += nul + 1;
        } else {
            if tagged.len() < pos + 4 {
                return Err(DictError::CorruptArchive("truncated length-prefixed field".into()));
            }
            let len = BigEndian::read_u32(&tagged[pos..pos + 4]) as usize;
            pos += 4;
            if tagged.len() < pos + len {
                return Err(DictError::CorruptArchive("truncated length-prefixed field".into()));
            }
            fields.push(Field {
                kind,
                payload: &tagged[pos..pos + len],
            });
            pos += len;
        }
    }

    Ok(fields)
}

/// Types whose payload is free text that substring search should look
/// inside.
const TEXT_SEARCH_TYPES: &[u8] = b"mlgxty";

/// `true` if this dictionary can ever answer a substring ("data") query:
/// either it has no fixed type sequence (so articles may carry any type,
/// including text ones), or its fixed sequence includes a text type.
pub fn contains_find_data(sametypesequence: &str) -> bool {
    sametypesequence.is_empty() || sametypesequence.bytes().any(|b| TEXT_SEARCH_TYPES.contains(&b))
}

/// Reports whether every needle in `needles` occurs as a substring inside
/// some text field of `tagged`.
pub fn find_data(tagged: &[u8], needles: &[String]) -> Result<bool, DictError> {
    if needles.is_empty() {
        return Ok(false);
    }

    let mut haystacks: Vec<String> = Vec::new();
    for field in fields(tagged)? {
        if TEXT_SEARCH_TYPES.contains(&field.kind) {
            haystacks.push(String::from_utf8_lossy(field.payload).into_owned());
        }
    }

    Ok(needles
        .iter()
        .all(|needle| haystacks.iter().any(|h| h.contains(needle.as_str()))))
}

/// A small per-dictionary LRU-ish cache of recently rendered article bytes,
/// keyed by their on-disk location. Grounded on `dictionarybase.cpp`'s
/// article cache (capacity there is implementation-defined; this crate uses
/// 10 entries, matching the component design).
pub struct ArticleCache {
    entries: Vec<(u64, Vec<u8>)>,
    capacity: usize,
}

impl ArticleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, offset: u64) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|(_, data)| data.as_slice())
    }

    pub fn insert(&mut self, offset: u64, data: Vec<u8>) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push((offset, data));
    }
}
