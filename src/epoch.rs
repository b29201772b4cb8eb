//! Trial segmentation.
//!
//! Pairs every start marker with the first stop marker strictly after it and
//! turns the pair into a [`TrialWindow`]:
//!
//! ```text
//!        pre-roll         task
//!   ├──────────────┼──────────────────┤
//!  start          onset              stop          window = [start, stop)
//! ```
//!
//! Two rules drop trials:
//! - **incomplete**: no stop after the onset. This start and all later ones
//!   are dropped and segmentation of the file ends;
//! - **malformed**: `stop − onset < min_samples`. The trial is skipped and the
//!   following starts are still processed.
//!
//! Dropped trials never produce a label, so windows and labels stay paired.

/// A start marker placed on the continuous stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Start {
    pub sample: usize,
    /// Binary class (see [`binarize_labels`]).
    pub label: u8,
}

/// Segmentation thresholds in native samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRule {
    /// Shortest accepted onset → stop distance.
    pub min_samples: usize,
    /// Samples kept before the onset.
    pub pre_roll_samples: usize,
}

/// Sample range of one accepted trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialWindow {
    /// First sample, `onset − pre_roll` clamped at 0.
    pub start: usize,
    /// Sample of the start marker.
    pub onset: usize,
    /// Sample of the matching stop marker (exclusive end).
    pub stop: usize,
    pub label: u8,
}

impl TrialWindow {
    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

/// Outcome of segmenting one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segmentation {
    pub trials: Vec<TrialWindow>,
    /// Starts skipped because the stop came too soon.
    pub malformed: usize,
    /// Starts dropped because no stop followed.
    pub incomplete: usize,
    /// Windows whose pre-roll reached before the first sample.
    pub clamped: usize,
}

impl Segmentation {
    pub fn labels(&self) -> Vec<u8> {
        self.trials.iter().map(|t| t.label).collect()
    }
}

/// Map raw label codes to `{0, 1}`: `1` where the code equals the file's
/// maximum code, `0` elsewhere.
///
/// With both classes present this is `left → 0`, `right → 1` (legend order).
/// A file holding only one class maps all of its trials to `1`.
pub fn binarize_labels(codes: &[usize]) -> Vec<u8> {
    let Some(&max) = codes.iter().max() else {
        return Vec::new();
    };
    codes.iter().map(|&c| u8::from(c == max)).collect()
}

/// Cut trial windows out of one file.
///
/// `starts` and `stops` must be ascending in sample order.
pub fn segment(starts: &[Start], stops: &[usize], rule: SegmentRule) -> Segmentation {
    let mut out = Segmentation::default();

    for (k, st) in starts.iter().enumerate() {
        let next = stops.partition_point(|&s| s <= st.sample);
        let Some(&stop) = stops.get(next) else {
            out.incomplete = starts.len() - k;
            log::warn!(
                "start at sample {} has no stop marker; dropping it and {} later start(s)",
                st.sample,
                out.incomplete - 1
            );
            break;
        };

        if stop - st.sample < rule.min_samples {
            out.malformed += 1;
            log::debug!(
                "trial at sample {} too short ({} < {} samples), skipped",
                st.sample,
                stop - st.sample,
                rule.min_samples
            );
            continue;
        }

        if st.sample < rule.pre_roll_samples {
            out.clamped += 1;
        }
        out.trials.push(TrialWindow {
            start: st.sample.saturating_sub(rule.pre_roll_samples),
            onset: st.sample,
            stop,
            label: st.label,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: SegmentRule = SegmentRule { min_samples: 5000, pre_roll_samples: 5000 };

    fn s(sample: usize, label: u8) -> Start {
        Start { sample, label }
    }

    #[test]
    fn single_trial_window() {
        let seg = segment(&[s(10_000, 1)], &[16_000], RULE);
        assert_eq!(
            seg.trials,
            vec![TrialWindow { start: 5000, onset: 10_000, stop: 16_000, label: 1 }]
        );
        assert_eq!(seg.trials[0].len(), 11_000);
    }

    #[test]
    fn stop_must_be_strictly_later() {
        // A stop on the onset sample belongs to the previous trial.
        let seg = segment(&[s(10_000, 0)], &[10_000, 20_000], RULE);
        assert_eq!(seg.trials[0].stop, 20_000);
    }

    #[test]
    fn trailing_start_without_stop_ends_file() {
        let seg = segment(&[s(10_000, 0), s(30_000, 1), s(50_000, 0)], &[20_000], RULE);
        assert_eq!(seg.trials.len(), 1);
        assert_eq!(seg.labels(), vec![0]);
        assert_eq!(seg.incomplete, 2);
    }

    #[test]
    fn short_trial_skipped_neighbours_kept() {
        let starts = [s(10_000, 0), s(30_000, 1), s(50_000, 0)];
        let stops = [20_000, 34_000, 60_000];
        let seg = segment(&starts, &stops, RULE);
        assert_eq!(seg.malformed, 1);
        assert_eq!(seg.labels(), vec![0, 0]);
        assert_eq!(seg.trials[1].onset, 50_000);
    }

    #[test]
    fn exact_threshold_is_accepted() {
        let seg = segment(&[s(10_000, 1)], &[15_000], RULE);
        assert_eq!(seg.trials.len(), 1);
        let seg = segment(&[s(10_000, 1)], &[14_999], RULE);
        assert_eq!(seg.trials.len(), 0);
    }

    #[test]
    fn pre_roll_clamps_at_zero() {
        let seg = segment(&[s(1200, 1)], &[9000], RULE);
        assert_eq!(seg.trials[0].start, 0);
        assert_eq!(seg.clamped, 1);
    }

    #[test]
    fn every_trial_respects_minimum() {
        let starts: Vec<Start> = (0..40).map(|k| s(k * 7_000 + 100, (k % 2) as u8)).collect();
        let stops: Vec<usize> = (0..40).map(|k| k * 7_000 + 100 + 1_000 * (k % 8)).collect();
        let seg = segment(&starts, &stops, RULE);
        for t in &seg.trials {
            assert!(t.stop - t.onset >= RULE.min_samples);
        }
        assert_eq!(seg.trials.len() + seg.malformed + seg.incomplete, starts.len());
    }

    #[test]
    fn binarize_by_file_maximum() {
        assert_eq!(binarize_labels(&[1, 2, 2, 1]), vec![0, 1, 1, 0]);
        // Single-class file: everything becomes 1.
        assert_eq!(binarize_labels(&[1, 1, 1]), vec![1, 1, 1]);
        assert!(binarize_labels(&[]).is_empty());
    }
}
