use std::io;
use std::string::FromUtf8Error;

/// Error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    /// The `.ifo` file is missing its magic header, a required field, or has
    /// a field that fails to parse as the type it is declared to hold.
    #[error("invalid .ifo file: {0}")]
    InvalidIfo(String),

    /// A `.idx`, `.dict` or `.dict.dz` file is truncated, has a bad magic
    /// number, or fails an internal consistency check.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// A dictzip or `.ifo` format version this crate does not implement.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(String),

    /// Random-access reads are not possible on this file (e.g. a plain-GZIP
    /// `.dict.dz` without a dictzip random-access extra field).
    #[error("file does not support random access reads")]
    NotRandomAccessible,

    /// A word was not found. Not really an error - a normal lookup outcome -
    /// but modeled as one since most lookup call sites propagate with `?`.
    #[error("word \"{0}\" not found")]
    WordNotFound(String),

    /// This reports a malicious/malformed index file which requests a buffer
    /// that is too large.
    #[error("requested too much memory for a single article")]
    MemoryError,

    /// A wrapped `io::Error`.
    #[error("I/O error")]
    IoError(#[from] io::Error),

    /// A wrapped `string::FromUtf8Error`.
    #[error("UTF-8 error")]
    Utf8Error(#[from] FromUtf8Error),

    /// Errors thrown by the flate2 crate - not really descriptive, though.
    #[error("decompression error")]
    Deflate(#[from] flate2::DecompressError),
}
