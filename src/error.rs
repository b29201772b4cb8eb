//! Error types.
//!
//! [`XdfError`] covers everything that can go wrong while decoding an XDF
//! container.  [`Error`] is the crate-level error returned by the extraction
//! pipeline; a decoding failure surfaces there as [`Error::Read`] together
//! with the offending path.
//!
//! Dropped trials (no matching stop marker, stop marker too early) are *not*
//! errors: they are counted in [`crate::dataset::FileReport`].
use std::path::PathBuf;

/// Failure while decoding an XDF file.
#[derive(Debug, thiserror::Error)]
pub enum XdfError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an XDF file (magic bytes {0:?})")]
    BadMagic([u8; 4]),

    #[error("unexpected end of chunk: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid length field width {0} (expected 1, 4 or 8)")]
    BadLength(u8),

    #[error("samples chunk for undeclared stream id {0}")]
    UnknownStream(u32),

    #[error("malformed stream header XML: {0}")]
    Xml(String),

    #[error("unsupported channel format '{0}'")]
    UnsupportedFormat(String),

    #[error("string value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("stream {stream_id}: {got} values per sample, header declares {expected}")]
    ShapeMismatch { stream_id: u32, expected: usize, got: usize },
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sample vector width has no known channel layout.
    #[error("unsupported channel layout: {0} channels (known layouts: 72, 75)")]
    UnsupportedLayout(usize),

    /// The recording could not be read or decoded.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: XdfError,
    },

    #[error("stream '{0}' not found in recording")]
    MissingStream(String),

    #[error("channel '{0}' not present in layout")]
    MissingChannel(String),

    #[error("stream '{0}' does not carry numeric samples")]
    NotNumeric(String),

    #[error("stream '{0}' does not carry string samples")]
    NotText(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("video sync: {0}")]
    Sync(String),

    /// Writing to a replay outlet failed.
    #[error("outlet i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
