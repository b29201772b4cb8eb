//! Channel layouts of the NeurOne amplifier recordings.
//!
//! The amplifier stream carries no usable channel metadata, so the layout is
//! chosen from the sample-vector width alone:
//!
//! | width | contents                                                   |
//! |-------|------------------------------------------------------------|
//! | 72    | 64 EEG + 4 EMG + 4 EOG                                     |
//! | 75    | the 72 above + ECG + Respiration + GSR                     |
//!
//! Any other width is rejected; no inference is attempted.
use ndarray::{Array2, Axis};

use crate::error::{Error, Result};

/// Physiological signal kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Primary signal.
    Eeg,
    /// Muscle.
    Emg,
    /// Ocular.
    Eog,
    /// Cardiac.
    Ecg,
    /// Auxiliary biosignal (respiration, skin conductance).
    Bio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: &'static str,
    pub kind: ChannelKind,
}

/// Channel order shared by both layouts.
const BASE_CHANNELS: [&str; 72] = [
    "Fp1", "Fpz", "Fp2", "F7", "F3", "Fz", "F4", "F8", "FC5", "FC1",
    "FC2", "FC6", "M1", "T7", "C3", "Cz", "C4", "T8", "M2", "CP5",
    "CP1", "CP2", "CP6", "P7", "P3", "Pz", "P4", "P8", "POz", "O1",
    "Oz", "O2", "EMG_RH", "EMG_LH", "EMG_RF", "EMG_LF", "EOG_R", "EOG_L", "EOG_U", "EOG_D",
    "AF7", "AF3", "AF4", "AF8", "F5", "F1", "F2", "F6", "FC3", "FCz",
    "FC4", "C5", "C1", "C2", "C6", "CP3", "CPz", "CP4", "P5", "P1",
    "P2", "P6", "PO5", "PO3", "PO4", "PO6", "FT7", "FT8", "TP7", "TP8",
    "PO7", "PO8",
];

/// Extra channels of the 75-wide layout.
const AUX_CHANNELS: [(&str, ChannelKind); 3] = [
    ("ECG", ChannelKind::Ecg),
    ("Respiration", ChannelKind::Bio),
    ("GSR", ChannelKind::Bio),
];

/// EEG slots overwritten by leg EMG when muscle signals are requested:
/// `(target EEG channel, EMG source channel)`.
pub const EMG_SUBSTITUTIONS: [(&str, &str); 4] = [
    ("C3", "EMG_LF"),
    ("C4", "EMG_RF"),
    ("CP3", "EMG_LF"),
    ("CP4", "EMG_RF"),
];

fn base_kind(name: &str) -> ChannelKind {
    if name.starts_with("EMG_") {
        ChannelKind::Emg
    } else if name.starts_with("EOG_") {
        ChannelKind::Eog
    } else {
        ChannelKind::Eeg
    }
}

/// Ordered `(name, kind)` list matching the sample vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: Vec<Channel>,
}

impl ChannelLayout {
    /// Layout for a sample vector of `width` values.
    ///
    /// Fails with [`Error::UnsupportedLayout`] for anything but 72 or 75.
    pub fn for_width(width: usize) -> Result<Self> {
        let base = BASE_CHANNELS.iter().map(|&name| Channel { name, kind: base_kind(name) });
        let channels: Vec<Channel> = match width {
            72 => base.collect(),
            75 => base
                .chain(AUX_CHANNELS.iter().map(|&(name, kind)| Channel { name, kind }))
                .collect(),
            other => return Err(Error::UnsupportedLayout(other)),
        };
        debug_assert_eq!(channels.len(), width);
        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Like [`index_of`](Self::index_of) but fails with [`Error::MissingChannel`].
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| Error::MissingChannel(name.to_string()))
    }

    /// Indices of all channels of one kind, in layout order.
    pub fn picks(&self, kind: ChannelKind) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// `(target, source)` row indices of [`EMG_SUBSTITUTIONS`].
    pub fn emg_substitutions(&self) -> Result<Vec<(usize, usize)>> {
        EMG_SUBSTITUTIONS
            .iter()
            .map(|&(target, source)| Ok((self.require(target)?, self.require(source)?)))
            .collect()
    }
}

/// Copy the EMG rows into their EEG slots of `data` (`[C, T]`, full layout).
pub fn substitute_emg(data: &mut Array2<f64>, layout: &ChannelLayout) -> Result<()> {
    for (target, source) in layout.emg_substitutions()? {
        let src = data.row(source).to_owned();
        data.row_mut(target).assign(&src);
        log::debug!(
            "row {target} ({}) <- row {source} ({})",
            layout.channels[target].name,
            layout.channels[source].name
        );
    }
    Ok(())
}

/// Keep only the rows of one channel kind.
pub fn pick_kind(data: &Array2<f64>, layout: &ChannelLayout, kind: ChannelKind) -> Array2<f64> {
    data.select(Axis(0), &layout.picks(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_length_equals_width() {
        for w in [72, 75] {
            assert_eq!(ChannelLayout::for_width(w).unwrap().len(), w);
        }
    }

    #[test]
    fn unknown_widths_fail() {
        for w in [0, 1, 64, 71, 73, 74, 76, 128] {
            assert!(matches!(ChannelLayout::for_width(w), Err(Error::UnsupportedLayout(x)) if x == w));
        }
    }

    #[test]
    fn kinds_per_layout() {
        let l72 = ChannelLayout::for_width(72).unwrap();
        assert_eq!(l72.picks(ChannelKind::Eeg).len(), 64);
        assert_eq!(l72.picks(ChannelKind::Emg), vec![32, 33, 34, 35]);
        assert_eq!(l72.picks(ChannelKind::Eog), vec![36, 37, 38, 39]);
        assert!(l72.picks(ChannelKind::Ecg).is_empty());

        let l75 = ChannelLayout::for_width(75).unwrap();
        assert_eq!(l75.picks(ChannelKind::Eeg).len(), 64);
        assert_eq!(l75.picks(ChannelKind::Ecg), vec![72]);
        assert_eq!(l75.picks(ChannelKind::Bio), vec![73, 74]);
    }

    #[test]
    fn substitution_slots_resolve_by_name() {
        let l = ChannelLayout::for_width(72).unwrap();
        assert_eq!(l.emg_substitutions().unwrap(), vec![(14, 35), (16, 34), (55, 35), (57, 34)]);
    }

    #[test]
    fn substitute_then_pick() {
        let l = ChannelLayout::for_width(72).unwrap();
        let mut data = Array2::from_shape_fn((72, 4), |(c, _)| c as f64);
        substitute_emg(&mut data, &l).unwrap();
        assert_eq!(data[[14, 0]], 35.0);
        assert_eq!(data[[57, 3]], 34.0);

        let eeg = pick_kind(&data, &l, ChannelKind::Eeg);
        assert_eq!(eeg.dim(), (64, 4));
        // Row 40 of the full layout (AF7) becomes row 32 once EMG/EOG are dropped.
        assert_eq!(eeg[[32, 0]], 40.0);
    }
}
