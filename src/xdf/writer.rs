//! Minimal XDF writer.
//!
//! Produces files the reader (and pyxdf / LabRecorder tooling) accepts.
//! Used to build fixtures and to export synthetic sessions.
//!
//! ```rust,no_run
//! use xdfepoch::xdf::{ChannelFormat, StreamHeader, XdfWriter};
//!
//! let mut w = XdfWriter::new();
//! w.add_stream(StreamHeader::new(1, "Game State", "Flags", 1, 0.0, ChannelFormat::String));
//! w.add_text_samples(1, &[0.5], &[vec!["Monster left".to_string()]]).unwrap();
//! w.write("/tmp/session.xdf").unwrap();
//! ```
use std::collections::HashMap;
use std::path::Path;

use ndarray::ArrayView2;

use super::chunk::{write_chunk, write_varlen, ChunkTag, MAGIC};
use super::header::{ChannelFormat, StreamHeader};
use crate::error::XdfError;

#[derive(Debug)]
pub struct XdfWriter {
    buf: Vec<u8>,
    headers: HashMap<u32, StreamHeader>,
    /// Stream ids in declaration order (footers are written in this order).
    order: Vec<u32>,
}

impl Default for XdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XdfWriter {
    /// Start a file: magic + FileHeader chunk.
    pub fn new() -> Self {
        let mut buf = MAGIC.to_vec();
        write_chunk(
            &mut buf,
            ChunkTag::FileHeader,
            b"<?xml version=\"1.0\"?><info><version>1.0</version></info>",
        );
        Self { buf, headers: HashMap::new(), order: Vec::new() }
    }

    /// Declare a stream (StreamHeader chunk).
    pub fn add_stream(&mut self, header: StreamHeader) -> &mut Self {
        let mut content = header.stream_id.to_le_bytes().to_vec();
        content.extend_from_slice(header.to_xml().as_bytes());
        write_chunk(&mut self.buf, ChunkTag::StreamHeader, &content);
        self.order.push(header.stream_id);
        self.headers.insert(header.stream_id, header);
        self
    }

    /// Numeric samples from a `[C, T]` array, one timestamp per column.
    pub fn add_numeric_samples(
        &mut self,
        stream_id: u32,
        timestamps: &[f64],
        data: ArrayView2<'_, f64>,
    ) -> Result<&mut Self, XdfError> {
        let stamps: Vec<Option<f64>> = timestamps.iter().copied().map(Some).collect();
        let rows: Vec<Vec<f64>> = data.columns().into_iter().map(|c| c.to_vec()).collect();
        self.add_numeric_samples_sparse(stream_id, &stamps, &rows)
    }

    /// Numeric samples where any timestamp may be omitted (`None`).
    pub fn add_numeric_samples_sparse(
        &mut self,
        stream_id: u32,
        timestamps: &[Option<f64>],
        samples: &[Vec<f64>],
    ) -> Result<&mut Self, XdfError> {
        let header = self.headers.get(&stream_id).ok_or(XdfError::UnknownStream(stream_id))?;
        let fmt = header.channel_format;
        if !fmt.is_numeric() {
            return Err(XdfError::UnsupportedFormat(format!("numeric samples into {} stream", fmt.as_str())));
        }
        let n_ch = header.channel_count;
        let mut content = samples_prelude(stream_id, samples.len());
        for (ts, row) in timestamps.iter().zip(samples) {
            if row.len() != n_ch {
                return Err(XdfError::ShapeMismatch { stream_id, expected: n_ch, got: row.len() });
            }
            push_timestamp(&mut content, *ts);
            for &v in row {
                match fmt {
                    ChannelFormat::Float32 => content.extend_from_slice(&(v as f32).to_le_bytes()),
                    ChannelFormat::Double64 => content.extend_from_slice(&v.to_le_bytes()),
                    ChannelFormat::Int8 => content.extend_from_slice(&(v as i8).to_le_bytes()),
                    ChannelFormat::Int16 => content.extend_from_slice(&(v as i16).to_le_bytes()),
                    ChannelFormat::Int32 => content.extend_from_slice(&(v as i32).to_le_bytes()),
                    ChannelFormat::Int64 => content.extend_from_slice(&(v as i64).to_le_bytes()),
                    ChannelFormat::String => unreachable!("checked above"),
                }
            }
        }
        write_chunk(&mut self.buf, ChunkTag::Samples, &content);
        Ok(self)
    }

    /// String samples, one row of `channel_count` values per timestamp.
    pub fn add_text_samples(
        &mut self,
        stream_id: u32,
        timestamps: &[f64],
        samples: &[Vec<String>],
    ) -> Result<&mut Self, XdfError> {
        let header = self.headers.get(&stream_id).ok_or(XdfError::UnknownStream(stream_id))?;
        if header.channel_format != ChannelFormat::String {
            return Err(XdfError::UnsupportedFormat(format!(
                "string samples into {} stream",
                header.channel_format.as_str()
            )));
        }
        let n_ch = header.channel_count;
        let mut content = samples_prelude(stream_id, samples.len());
        for (&ts, row) in timestamps.iter().zip(samples) {
            if row.len() != n_ch {
                return Err(XdfError::ShapeMismatch { stream_id, expected: n_ch, got: row.len() });
            }
            push_timestamp(&mut content, Some(ts));
            for v in row {
                write_varlen(&mut content, v.len() as u64);
                content.extend_from_slice(v.as_bytes());
            }
        }
        write_chunk(&mut self.buf, ChunkTag::Samples, &content);
        Ok(self)
    }

    /// ClockOffset chunk.
    pub fn add_clock_offset(&mut self, stream_id: u32, collection_time: f64, offset: f64) -> &mut Self {
        let mut content = stream_id.to_le_bytes().to_vec();
        content.extend_from_slice(&collection_time.to_le_bytes());
        content.extend_from_slice(&offset.to_le_bytes());
        write_chunk(&mut self.buf, ChunkTag::ClockOffset, &content);
        self
    }

    /// Append the stream footers and return the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        for id in std::mem::take(&mut self.order) {
            let mut content = id.to_le_bytes().to_vec();
            content.extend_from_slice(b"<?xml version=\"1.0\"?><info></info>");
            write_chunk(&mut self.buf, ChunkTag::StreamFooter, &content);
        }
        self.buf
    }

    pub fn write<P: AsRef<Path>>(self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.finish())
    }
}

fn samples_prelude(stream_id: u32, n_samples: usize) -> Vec<u8> {
    let mut content = stream_id.to_le_bytes().to_vec();
    write_varlen(&mut content, n_samples as u64);
    content
}

fn push_timestamp(content: &mut Vec<u8>, ts: Option<f64>) {
    match ts {
        Some(t) => {
            content.push(8);
            content.extend_from_slice(&t.to_le_bytes());
        }
        None => content.push(0),
    }
}
