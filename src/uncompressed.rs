use std::io::{self, Read, Seek, SeekFrom};

use rassert_rs::rassert;

use crate::error::DictError;
use crate::index::Location;
use crate::reader::{DictReader, MAX_BYTES_FOR_BUFFER};
use DictError::*;

/// Reads articles out of a plain, uncompressed `.dict` file.
pub struct Uncompressed<R: Read + Seek> {
    reader: R,
    length: u64,
}

impl<R: Read + Seek> Uncompressed<R> {
    pub fn new(mut reader: R) -> Result<Self, DictError> {
        let length = reader.seek(SeekFrom::End(0))?;
        Ok(Self { reader, length })
    }
}

impl<R: Read + Seek> DictReader for Uncompressed<R> {
    fn fetch(&mut self, location: Location) -> Result<Vec<u8>, DictError> {
        rassert!(location.size <= MAX_BYTES_FOR_BUFFER, MemoryError);
        rassert!(
            location.offset + location.size <= self.length,
            IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek beyond the end of uncompressed data was requested"
            ))
        );

        self.reader.seek(SeekFrom::Start(location.offset))?;
        let mut data = vec![0u8; location.size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn loc(offset: u64, size: u64) -> Location {
        Location { offset, size }
    }

    #[test]
    fn reads_the_requested_slice() {
        let data = Cursor::new(b"Ignore me: important".to_vec());
        let mut reader = Uncompressed::new(data).unwrap();
        let bytes = reader.fetch(loc(11, 9)).unwrap();
        assert_eq!(bytes, b"important");
    }

    #[test]
    fn rejects_reads_past_eof() {
        let data = Cursor::new(b"short".to_vec());
        let mut reader = Uncompressed::new(data).unwrap();
        assert!(reader.fetch(loc(0, 100)).is_err());
    }

    #[test]
    fn rejects_oversized_requests() {
        let data = Cursor::new(vec![0u8; 16]);
        let mut reader = Uncompressed::new(data).unwrap();
        assert!(reader.fetch(loc(0, MAX_BYTES_FOR_BUFFER + 1)).is_err());
    }
}
