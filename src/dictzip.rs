//! Random-access reader for `.dict.dz` (dictzip) files.
//!
//! A dictzip file is an ordinary gzip stream whose `FEXTRA` field carries a
//! `"RA"` subfield recording the pre-compression chunk size and the
//! compressed length of every chunk. That lets us inflate only the handful
//! of chunks a lookup actually needs instead of the whole archive.
//!
//! Parsing is grounded on the teacher's `compressed.rs`; the chunk cache
//! (absent there) is grounded on `dictionaryzip.cpp`'s `DICT_CACHE_SIZE`
//! array of `(chunk, data, stamp)` slots, evicted by oldest stamp.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use rassert_rs::rassert;

use crate::error::DictError;
use crate::index::Location;
use crate::reader::{DictReader, MAX_BYTES_FOR_BUFFER};
use DictError::*;

const GZ_FEXTRA: u8 = 0b0000_0100;
const GZ_FNAME: u8 = 0b0000_1000;
const GZ_COMMENT: u8 = 0b0001_0000;
const GZ_FHCRC: u8 = 0b0000_0010;

/// Number of decompressed chunks kept around between reads.
const CHUNK_CACHE_SIZE: usize = 5;

#[derive(Debug)]
struct Chunk {
    offset: u64,
    length: usize,
}

struct CachedChunk {
    index: usize,
    data: Vec<u8>,
    stamp: u64,
}

/// Classification of a `.dict`/`.dict.dz` container.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Kind {
    Plain,
    Gzip,
    DictZip,
}

/// Sniffs the leading bytes of a file to tell a plain file from a gzip
/// stream, and a plain gzip stream from a dictzip (random-access) one.
pub fn classify<R: Read + Seek>(reader: &mut R) -> io::Result<Kind> {
    let pos = reader.seek(SeekFrom::Current(0))?;
    let mut magic = [0u8; 4];
    let n = reader.read(&mut magic)?;
    reader.seek(SeekFrom::Start(pos))?;
    if n < 4 || magic[0] != 0x1F || magic[1] != 0x8B {
        return Ok(Kind::Plain);
    }
    if magic[3] & GZ_FEXTRA != 0 {
        Ok(Kind::DictZip)
    } else {
        Ok(Kind::Gzip)
    }
}

/// Reads articles out of a dictzip-compressed `.dict.dz` file.
pub struct DictZip<B: Read + Seek> {
    buf: B,
    uchunk_length: usize,
    end_compressed_data: u64,
    chunk_offsets: Vec<u64>,
    ufile_length: u64,
    cache: Vec<CachedChunk>,
    stamp: u64,
}

impl<B: Read + Seek> DictZip<B> {
    pub fn new(mut buf: B) -> Result<Self, DictError> {
        let mut header = [0u8; 12];
        buf.read_exact(&mut header)?;
        rassert!(
            &header[0..2] == &[0x1F, 0x8B],
            CorruptArchive("not in gzip format".into())
        );

        let flags = header[3];
        rassert!(
            flags & GZ_FEXTRA != 0,
            NotRandomAccessible
        );

        let xlen = LittleEndian::read_u16(&header[10..12]);
        let mut fextra = vec![0u8; xlen as usize];
        buf.read_exact(&mut fextra)?;
        rassert!(
            &fextra[0..2] == b"RA",
            NotRandomAccessible
        );

        let subfield_length = LittleEndian::read_u16(&fextra[2..4]);
        rassert!(
            subfield_length == xlen - 4,
            CorruptArchive("FEXTRA subfield length mismatch".into())
        );

        let version = LittleEndian::read_u16(&fextra[4..6]);
        rassert!(
            version == 1,
            UnsupportedVersion(format!("dictzip version {}", version))
        );

        let uchunk_length = LittleEndian::read_u16(&fextra[6..8]) as usize;
        let chunk_count = LittleEndian::read_u16(&fextra[8..10]);
        rassert!(
            chunk_count != 0,
            CorruptArchive("no compressed chunks in file".into())
        );

        let max_chunks = ((fextra.len() - 10) / 2) as u16;
        rassert!(
            max_chunks == chunk_count,
            CorruptArchive(format!(
                "header claims {} chunks but FEXTRA holds room for {}",
                chunk_count, max_chunks
            ))
        );

        if flags & GZ_FNAME != 0 {
            while buf.read_u8()? != b'\0' {}
        }
        if flags & GZ_COMMENT != 0 {
            while buf.read_u8()? != b'\0' {}
        }
        if flags & GZ_FHCRC != 0 {
            buf.seek(SeekFrom::Current(2))?;
        }

        let mut chunk_offsets = Vec::with_capacity(chunk_count as usize);
        let mut end_compressed_data = buf.seek(SeekFrom::Current(0))?;

        let chunks_from_header = &fextra[10..(10 + chunk_count * 2) as usize];
        for slice in chunks_from_header.chunks(2) {
            let size = LittleEndian::read_u16(slice) as u64;
            chunk_offsets.push(end_compressed_data);
            end_compressed_data += size;
        }

        buf.seek(SeekFrom::Start(end_compressed_data))?;
        let ufile_length = buf.read_u32::<LittleEndian>()? as u64;

        Ok(Self {
            buf,
            uchunk_length,
            end_compressed_data,
            chunk_offsets,
            ufile_length,
            cache: Vec::with_capacity(CHUNK_CACHE_SIZE),
            stamp: 0,
        })
    }

    fn chunks_for(&self, start_offset: u64, size: u64) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let start = (start_offset as usize) / self.uchunk_length;
        let end = ((start_offset + size).saturating_sub(1) as usize) / self.uchunk_length;
        for id in start..=end {
            let offset = self.chunk_offsets[id];
            let length = match self.chunk_offsets.get(id + 1) {
                Some(next) => next - offset,
                None => self.end_compressed_data - offset,
            } as usize;
            chunks.push(Chunk { offset, length });
        }
        chunks
    }

    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, DictError> {
        let mut decoder = flate2::Decompress::new(false);
        let mut decoded = vec![0u8; self.uchunk_length];
        let before = decoder.total_out();
        decoder.decompress(data, &mut decoded, flate2::FlushDecompress::Finish)?;
        let produced = (decoder.total_out() - before) as usize;
        decoded.truncate(produced.min(self.uchunk_length));
        Ok(decoded)
    }

    /// Returns the decompressed bytes of chunk `index`, consulting (and
    /// updating) the LRU cache first.
    fn chunk_data(&mut self, index: usize, chunk: &Chunk) -> Result<Vec<u8>, DictError> {
        if let Some(slot) = self.cache.iter_mut().find(|c| c.index == index) {
            self.stamp += 1;
            slot.stamp = self.stamp;
            return Ok(slot.data.clone());
        }

        self.buf.seek(SeekFrom::Start(chunk.offset))?;
        let mut compressed = vec![0u8; chunk.length];
        self.buf.read_exact(&mut compressed)?;
        let data = self.inflate(&compressed)?;

        self.stamp += 1;
        if self.cache.len() >= CHUNK_CACHE_SIZE {
            let oldest = self
                .cache
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.stamp)
                .map(|(i, _)| i)
                .expect("cache non-empty");
            self.cache.swap_remove(oldest);
        }
        self.cache.push(CachedChunk {
            index,
            data: data.clone(),
            stamp: self.stamp,
        });
        Ok(data)
    }
}

impl<B: Read + Seek> DictReader for DictZip<B> {
    fn fetch(&mut self, location: Location) -> Result<Vec<u8>, DictError> {
        rassert!(location.size <= MAX_BYTES_FOR_BUFFER, MemoryError);
        rassert!(
            location.offset + location.size <= self.ufile_length,
            IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek beyond the end of uncompressed data was requested"
            ))
        );

        let chunks = self.chunks_for(location.offset, location.size);
        let start_chunk = (location.offset as usize) / self.uchunk_length;

        let mut joined = Vec::with_capacity(location.size as usize + self.uchunk_length);
        for (i, chunk) in chunks.iter().enumerate() {
            joined.extend_from_slice(&self.chunk_data(start_chunk + i, chunk)?);
        }

        let cut_front = (location.offset as usize) % self.uchunk_length;
        let end = cut_front + location.size as usize;
        Ok(joined[cut_front..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build_dictzip(chunks: &[&[u8]]) -> Vec<u8> {
        let uchunk_length = chunks.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut compressed_chunks = Vec::new();
        for chunk in chunks {
            let mut encoder =
                flate2::Compress::new(flate2::Compression::default(), false);
            let mut out = vec![0u8; chunk.len() * 2 + 64];
            encoder
                .compress(chunk, &mut out, flate2::FlushCompress::Finish)
                .unwrap();
            let n = encoder.total_out() as usize;
            out.truncate(n);
            compressed_chunks.push(out);
        }

        let mut fextra = Vec::new();
        fextra.extend_from_slice(b"RA");
        let subfield_len = 6 + 2 * compressed_chunks.len();
        fextra.extend_from_slice(&(subfield_len as u16).to_le_bytes());
        fextra.extend_from_slice(&1u16.to_le_bytes()); // version
        fextra.extend_from_slice(&(uchunk_length as u16).to_le_bytes());
        fextra.extend_from_slice(&(compressed_chunks.len() as u16).to_le_bytes());
        for c in &compressed_chunks {
            fextra.extend_from_slice(&(c.len() as u16).to_le_bytes());
        }

        let mut file = Vec::new();
        file.extend_from_slice(&[0x1F, 0x8B, 8, GZ_FEXTRA, 0, 0, 0, 0, 0, 0xFF]);
        file.extend_from_slice(&(fextra.len() as u16).to_le_bytes());
        file.extend_from_slice(&fextra);
        for c in &compressed_chunks {
            file.extend_from_slice(c);
        }
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        file.extend_from_slice(&(total as u32).to_le_bytes());
        file.extend_from_slice(&[0u8; 4]); // CRC32, unused by this reader
        file
    }

    #[test]
    fn random_access_round_trips_across_chunk_boundaries() {
        let plain = b"the quick brown fox jumps over the lazy dog";
        let raw = build_dictzip(&[&plain[0..16], &plain[16..32], &plain[32..]]);
        let mut reader = DictZip::new(Cursor::new(raw)).unwrap();

        let got = reader
            .fetch(Location {
                offset: 10,
                size: 20,
            })
            .unwrap();
        assert_eq!(got, &plain[10..30]);
    }

    #[test]
    fn rejects_missing_fextra() {
        let data = Cursor::new(vec![0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 0, 0xFF, 0, 0]);
        assert!(DictZip::new(data).is_err());
    }
}
