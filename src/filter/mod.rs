//! IIR filter design and application.
//!
//! - [`design`]: Butterworth low-pass and notch design as second-order
//!   sections, matching `scipy.signal.butter(output='sos')` / `iirnotch`.
//! - [`apply`]: section cascade and zero-phase forward-backward filtering,
//!   matching `scipy.signal.sosfilt` / `sosfiltfilt`.

pub mod apply;
pub mod design;

pub use apply::{default_padlen, sosfilt, sosfilt_zi, sosfiltfilt, sosfiltfilt_rows};
pub use design::{butter_lowpass, iir_notch, magnitude, Sos};
