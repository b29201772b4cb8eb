//! XDF (Extensible Data Format) reader and writer.
//!
//! XDF is the container written by LabRecorder for Lab Streaming Layer
//! sessions: a sequence of chunks holding XML stream headers, timestamped
//! sample batches and clock-offset measurements for any number of streams.
//!
//! # Quick start
//! ```no_run
//! use xdfepoch::config::LoadOptions;
//! use xdfepoch::xdf::open_xdf;
//!
//! let rec = open_xdf("session.xdf", &LoadOptions::default()).unwrap();
//! for s in &rec.streams {
//!     println!("{}: {} samples @ {} Hz", s.name(), s.n_samples(), s.sfreq());
//! }
//! ```
pub mod chunk;
pub mod header;
pub mod reader;
pub mod writer;

pub use chunk::{ByteCursor, Chunk, ChunkReader, ChunkTag};
pub use header::{ChannelFormat, StreamHeader};
pub use reader::{open_xdf, read_xdf};
pub use writer::XdfWriter;
