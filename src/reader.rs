//! Article-body readers.
//!
//! A [`DictReader`] turns a [`Location`] (byte offset + size inside the
//! logical, uncompressed `.dict` content) into the raw bytes stored there.
//! Two implementations exist: [`crate::uncompressed::Uncompressed`] for plain
//! `.dict` files and [`crate::dictzip::DictZip`] for randomly-accessible
//! `.dict.dz` files.

use crate::error::DictError;
use crate::index::Location;

pub trait DictReader {
    /// Reads the bytes in `[location.offset, location.offset + location.size)`
    /// from the logical (uncompressed) article stream.
    fn fetch(&mut self, location: Location) -> Result<Vec<u8>, DictError>;
}

/// No headword article is ever larger than 1 MB; this guards against
/// malformed or malicious index entries requesting an enormous allocation.
pub const MAX_BYTES_FOR_BUFFER: u64 = 1_048_576;
