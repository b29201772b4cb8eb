//! Safetensors I/O for extracted datasets.
//!
//! A dataset of `N` trials is stored as
//!
//! | tensor      | dtype | shape        |
//! |-------------|-------|--------------|
//! | `x_{i}`     | F32   | `[C, T_i]`   |
//! | `y`         | I64   | `[N]`        |
//! | `n_trials`  | I32   | `[1]`        |
//!
//! so it loads directly with `safetensors.numpy.load_file`.
use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

use crate::dataset::Dataset;

// ── Low-level safetensors parser ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct TensorEntry {
    dtype: String,
    shape: Vec<usize>,
    start: usize,
    end: usize,
}

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, TensorEntry>, usize)> {
    ensure!(bytes.len() >= 8, "safetensors file too small");
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    let body = bytes.get(8..8 + n).context("safetensors header runs past end of file")?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(body).context("failed to parse safetensors header")?;

    let mut entries = HashMap::new();
    for (name, value) in header {
        if name == "__metadata__" {
            continue;
        }
        entries.insert(name.clone(), parse_entry(&value).with_context(|| format!("tensor '{name}'"))?);
    }
    Ok((entries, 8 + n))
}

fn parse_entry(v: &serde_json::Value) -> Result<TensorEntry> {
    let dtype = v["dtype"].as_str().context("missing dtype")?.to_string();
    let shape = v["shape"]
        .as_array()
        .context("missing shape")?
        .iter()
        .map(|d| d.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect::<Result<Vec<_>>>()?;
    let offsets = v["data_offsets"].as_array().context("missing data_offsets")?;
    ensure!(offsets.len() == 2, "data_offsets must have two entries");
    let start = offsets[0].as_u64().context("bad offset")? as usize;
    let end = offsets[1].as_u64().context("bad offset")? as usize;
    Ok(TensorEntry { dtype, shape, start, end })
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, e: &TensorEntry, dtype: &str, width: usize) -> Result<&'a [u8]> {
    ensure!(e.dtype == dtype, "expected {dtype}, found {}", e.dtype);
    let raw = bytes
        .get(data_start + e.start..data_start + e.end)
        .context("tensor data runs past end of file")?;
    let n: usize = e.shape.iter().product();
    ensure!(raw.len() == n * width, "tensor byte length {} does not match shape {:?}", raw.len(), e.shape);
    Ok(raw)
}

fn read_f32(bytes: &[u8], data_start: usize, e: &TensorEntry) -> Result<Vec<f32>> {
    let raw = tensor_bytes(bytes, data_start, e, "F32", 4)?;
    Ok(raw.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect())
}

fn read_i64(bytes: &[u8], data_start: usize, e: &TensorEntry) -> Result<Vec<i64>> {
    let raw = tensor_bytes(bytes, data_start, e, "I64", 8)?;
    Ok(raw
        .chunks_exact(8)
        .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect())
}

fn read_i32(bytes: &[u8], data_start: usize, e: &TensorEntry) -> Result<Vec<i32>> {
    let raw = tensor_bytes(bytes, data_start, e, "I32", 4)?;
    Ok(raw.chunks_exact(4).map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect())
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F32, I32 and I64 tensors.
///
/// ```rust,no_run
/// use xdfepoch::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_i64("label", &[1], &[1]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &Array2<f32>) {
        // Row-major, whatever the in-memory layout.
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    /// Serialise header and tensor data into one buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;

        let mut out = Vec::with_capacity(8 + hdr_bytes.len() + pad + offset);
        out.extend_from_slice(&((hdr_bytes.len() + pad) as u64).to_le_bytes());
        out.extend_from_slice(&hdr_bytes);
        out.extend(std::iter::repeat(b' ').take(pad));
        for (_, data, _, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?).with_context(|| format!("writing {}", path.display()))
    }
}

// ── Dataset files ─────────────────────────────────────────────────────────────

/// Write `ds` as `x_{i}` / `y` / `n_trials` tensors.
pub fn write_dataset(ds: &Dataset, path: &Path) -> Result<()> {
    ensure!(ds.x.len() == ds.y.len(), "{} matrices but {} labels", ds.x.len(), ds.y.len());
    let mut w = StWriter::new();
    for (i, x) in ds.x.iter().enumerate() {
        w.add_f32_arr2(&format!("x_{i}"), x);
    }
    w.add_i64("y", &ds.y, &[ds.y.len()]);
    w.add_i32("n_trials", &[ds.x.len() as i32], &[1]);
    w.write(path)?;
    log::info!("wrote {} trial(s) to {}", ds.len(), path.display());
    Ok(())
}

/// Read a file written by [`write_dataset`].  Reports are not stored, so the
/// returned dataset has none.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let n_entry = header.get("n_trials").context("missing 'n_trials' tensor")?;
    let n = match read_i32(&bytes, data_start, n_entry)?.as_slice() {
        [n] if *n >= 0 => *n as usize,
        other => bail!("invalid n_trials {other:?}"),
    };

    let y_entry = header.get("y").context("missing 'y' tensor")?;
    let y = read_i64(&bytes, data_start, y_entry)?;
    ensure!(y.len() == n, "n_trials is {n} but y holds {} labels", y.len());

    let mut x = Vec::with_capacity(n);
    for i in 0..n {
        let name = format!("x_{i}");
        let entry = header.get(&name).with_context(|| format!("missing '{name}' tensor"))?;
        let &[c, t] = entry.shape.as_slice() else {
            bail!("'{name}' has shape {:?}, expected [C, T]", entry.shape);
        };
        let data = read_f32(&bytes, data_start, entry)?;
        x.push(Array2::from_shape_vec((c, t), data)?);
    }

    Ok(Dataset { x, y, reports: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_eight_byte_aligned() {
        let mut w = StWriter::new();
        w.add_i32("a", &[7], &[1]);
        let bytes = w.to_bytes().unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
        assert_eq!(&bytes[8 + n..], &7i32.to_le_bytes());
    }

    #[test]
    fn dtype_mismatch_reported() {
        let mut w = StWriter::new();
        w.add_i32("y", &[1, 0], &[2]);
        let bytes = w.to_bytes().unwrap();
        let (header, start) = parse_header(&bytes).unwrap();
        let err = read_i64(&bytes, start, &header["y"]).unwrap_err();
        assert!(err.to_string().contains("expected I64"));
    }
}
