//! XDF chunk I/O.
//!
//! A chunk is the smallest structural unit of an XDF file.
//! On-disk layout (always little-endian):
//!
//! ```text
//! ┌───────────┬──────────────────┬────────────┬──────────────────────────┐
//! │ width : u8│ length : width B │  tag : u16 │ <length − 2 bytes content>│
//! └───────────┴──────────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! `width` is one of 1, 4 or 8 and gives the byte size of the `length`
//! field that follows ("variable-length integer").  The same varlen encoding
//! is used for sample counts and string value lengths inside chunks.
use std::io::Read;

use crate::error::XdfError;

/// File magic, first four bytes of every XDF file.
pub const MAGIC: &[u8; 4] = b"XDF:";

pub const TAG_FILE_HEADER: u16 = 1;
pub const TAG_STREAM_HEADER: u16 = 2;
pub const TAG_SAMPLES: u16 = 3;
pub const TAG_CLOCK_OFFSET: u16 = 4;
pub const TAG_BOUNDARY: u16 = 5;
pub const TAG_STREAM_FOOTER: u16 = 6;

// ── Chunk tag ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    FileHeader,
    StreamHeader,
    Samples,
    ClockOffset,
    Boundary,
    StreamFooter,
    Unknown(u16),
}

impl ChunkTag {
    pub fn from_u16(tag: u16) -> Self {
        match tag {
            TAG_FILE_HEADER => Self::FileHeader,
            TAG_STREAM_HEADER => Self::StreamHeader,
            TAG_SAMPLES => Self::Samples,
            TAG_CLOCK_OFFSET => Self::ClockOffset,
            TAG_BOUNDARY => Self::Boundary,
            TAG_STREAM_FOOTER => Self::StreamFooter,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::FileHeader => TAG_FILE_HEADER,
            Self::StreamHeader => TAG_STREAM_HEADER,
            Self::Samples => TAG_SAMPLES,
            Self::ClockOffset => TAG_CLOCK_OFFSET,
            Self::Boundary => TAG_BOUNDARY,
            Self::StreamFooter => TAG_STREAM_FOOTER,
            Self::Unknown(t) => t,
        }
    }
}

/// One chunk with its payload loaded.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub tag: ChunkTag,
    /// Byte offset of the chunk's width byte in the file.
    pub pos: usize,
    pub content: Vec<u8>,
}

// ── Streaming chunk reader ────────────────────────────────────────────────

/// Reads consecutive chunks from any byte source, tracking the file offset.
pub struct ChunkReader<R> {
    inner: R,
    pos: usize,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Current byte offset from the start of the source.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read and check the 4-byte file magic.
    pub fn read_magic(&mut self) -> Result<(), XdfError> {
        let mut magic = [0u8; 4];
        self.fill(&mut magic)?;
        if &magic != MAGIC {
            return Err(XdfError::BadMagic(magic));
        }
        Ok(())
    }

    /// Read the next chunk.
    ///
    /// Returns `Ok(None)` on a clean end of file (EOF exactly at a chunk
    /// boundary) and [`XdfError::Truncated`] if the file ends mid-chunk.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, XdfError> {
        let pos = self.pos;
        let mut width = [0u8; 1];
        match self.inner.read(&mut width) {
            Ok(0) => return Ok(None),
            Ok(_) => self.pos += 1,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => return self.next_chunk(),
            Err(e) => return Err(e.into()),
        }
        let len = self.read_varlen_body(width[0])?;
        if len < 2 {
            return Err(XdfError::Truncated { offset: self.pos, needed: 2 });
        }
        let mut tag = [0u8; 2];
        self.fill(&mut tag)?;
        // The length field is untrusted: grow the buffer only as bytes arrive.
        let body = len - 2;
        let mut content = Vec::new();
        (&mut self.inner).take(body).read_to_end(&mut content)?;
        self.pos += content.len();
        if (content.len() as u64) < body {
            return Err(XdfError::Truncated {
                offset: self.pos,
                needed: usize::try_from(body - content.len() as u64).unwrap_or(usize::MAX),
            });
        }
        Ok(Some(Chunk {
            tag: ChunkTag::from_u16(u16::from_le_bytes(tag)),
            pos,
            content,
        }))
    }

    fn read_varlen_body(&mut self, width: u8) -> Result<u64, XdfError> {
        match width {
            1 => {
                let mut b = [0u8; 1];
                self.fill(&mut b)?;
                Ok(b[0] as u64)
            }
            4 => {
                let mut b = [0u8; 4];
                self.fill(&mut b)?;
                Ok(u32::from_le_bytes(b) as u64)
            }
            8 => {
                let mut b = [0u8; 8];
                self.fill(&mut b)?;
                Ok(u64::from_le_bytes(b))
            }
            other => Err(XdfError::BadLength(other)),
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), XdfError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len();
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(XdfError::Truncated {
                offset: self.pos,
                needed: buf.len(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

// ── In-chunk cursor ───────────────────────────────────────────────────────

/// Bounds-checked little-endian cursor over a chunk payload.
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], XdfError> {
        if self.remaining() < n {
            return Err(XdfError::Truncated { offset: self.pos, needed: n });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Everything after the cursor.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], XdfError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, XdfError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32, XdfError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, XdfError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, XdfError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn i8(&mut self) -> Result<i8, XdfError> {
        Ok(i8::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, XdfError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, XdfError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, XdfError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Variable-length integer: width byte (1, 4, 8) followed by the value.
    pub fn varlen(&mut self) -> Result<u64, XdfError> {
        match self.u8()? {
            1 => Ok(self.u8()? as u64),
            4 => Ok(self.u32()? as u64),
            8 => Ok(u64::from_le_bytes(self.array()?)),
            other => Err(XdfError::BadLength(other)),
        }
    }
}

// ── Encoding helpers (used by the writer) ────────────────────────────────

/// Append a varlen integer using the narrowest width that fits.
pub fn write_varlen(out: &mut Vec<u8>, n: u64) {
    if n <= u8::MAX as u64 {
        out.push(1);
        out.push(n as u8);
    } else if n <= u32::MAX as u64 {
        out.push(4);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(8);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

/// Append a complete chunk (length, tag, content).
pub fn write_chunk(out: &mut Vec<u8>, tag: ChunkTag, content: &[u8]) {
    write_varlen(out, content.len() as u64 + 2);
    out.extend_from_slice(&tag.as_u16().to_le_bytes());
    out.extend_from_slice(content);
}
