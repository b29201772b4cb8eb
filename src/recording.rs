//! In-memory multi-stream recording, as produced by the loader.
//!
//! # Layout
//! ```text
//! Recording
//!   └─ streams[]            (header order of the file)
//!        ├─ header          name, type, channel count, nominal rate, labels
//!        ├─ timestamps[T]   seconds, non-decreasing
//!        ├─ series          Numeric [C, T] f64   |   Text T × [C] strings
//!        └─ clock_offsets   raw ClockOffset chunks
//! ```
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1};

use crate::config::LoadOptions;
use crate::error::{Error, Result};
use crate::events::Marker;
use crate::xdf::{self, StreamHeader};

/// Sample values of one stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    /// `[C, T]`, channel-major.
    Numeric(Array2<f64>),
    /// One row of `C` strings per sample.
    Text(Vec<Vec<String>>),
}

/// One ClockOffset measurement as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockOffset {
    pub collection_time: f64,
    pub offset: f64,
}

/// A single sample, borrowed from a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample<'a> {
    Numeric(ArrayView1<'a, f64>),
    Text(&'a [String]),
}

#[derive(Debug, Clone)]
pub struct Stream {
    pub header: StreamHeader,
    pub timestamps: Vec<f64>,
    pub series: Series,
    pub clock_offsets: Vec<ClockOffset>,
}

impl Stream {
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Nominal sampling rate (Hz); `0.0` for irregular streams.
    pub fn sfreq(&self) -> f64 {
        self.header.nominal_srate
    }

    pub fn n_samples(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_channels(&self) -> usize {
        self.header.channel_count
    }

    /// Numeric `[C, T]` data, or [`Error::NotNumeric`].
    pub fn numeric(&self) -> Result<&Array2<f64>> {
        match &self.series {
            Series::Numeric(data) => Ok(data),
            Series::Text(_) => Err(Error::NotNumeric(self.name().to_string())),
        }
    }

    /// Markers built from the first channel of a string stream.
    pub fn markers(&self) -> Result<Vec<Marker>> {
        match &self.series {
            Series::Text(rows) => Ok(self
                .timestamps
                .iter()
                .zip(rows)
                .map(|(&time, row)| Marker {
                    time,
                    label: row.first().cloned().unwrap_or_default(),
                })
                .collect()),
            Series::Numeric(_) => Err(Error::NotText(self.name().to_string())),
        }
    }

    /// Sample `idx` (panics when out of range, like slice indexing).
    pub fn sample(&self, idx: usize) -> Sample<'_> {
        match &self.series {
            Series::Numeric(data) => Sample::Numeric(data.column(idx)),
            Series::Text(rows) => Sample::Text(&rows[idx]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// File this recording was read from, if any.
    pub path: Option<PathBuf>,
    pub streams: Vec<Stream>,
}

impl Recording {
    /// First stream with the given name.
    pub fn stream(&self, name: &str) -> Option<&Stream> {
        self.streams.iter().find(|s| s.name() == name)
    }

    /// Like [`stream`](Self::stream) but fails with [`Error::MissingStream`].
    pub fn require(&self, name: &str) -> Result<&Stream> {
        self.stream(name).ok_or_else(|| Error::MissingStream(name.to_string()))
    }

    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.iter().map(Stream::name).collect()
    }
}

/// Load an XDF recording with default [`LoadOptions`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<Recording> {
    load_with(path, &LoadOptions::default())
}

/// Load an XDF recording.  Any decoding failure becomes [`Error::Read`].
pub fn load_with<P: AsRef<Path>>(path: P, opts: &LoadOptions) -> Result<Recording> {
    let path = path.as_ref();
    xdf::open_xdf(path, opts).map_err(|source| Error::Read { path: path.to_path_buf(), source })
}
