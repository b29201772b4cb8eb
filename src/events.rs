//! Marker → sample alignment.
//!
//! Markers live on their own irregular stream.  Each one is mapped to the
//! sample of the continuous stream whose timestamp is closest to it, and
//! labels are coded by their position in the sorted label legend:
//!
//! ```text
//! legend = sorted unique labels      e.g. ["Monster destroyed", "Monster left", "Monster right"]
//! code   = legend.index(label)             0                    1               2
//! sample = argmin_i |times[i] − t_marker|
//! ```
use std::collections::BTreeSet;

/// A labelled marker timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub time: f64,
    pub label: String,
}

/// A marker placed on the continuous stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub sample: usize,
    pub code: usize,
}

/// Index of the sample closest in time to `t`.
///
/// `times` must be ascending.  Events before the first or after the last
/// sample clamp to the boundary index; ties go to the lower index.
/// `None` for an empty stream.
pub fn nearest_sample(times: &[f64], t: f64) -> Option<usize> {
    if times.is_empty() {
        return None;
    }
    // First index with times[i] >= t.
    let hi = times.partition_point(|&x| x < t);
    if hi == 0 {
        return Some(0);
    }
    // First index of the run of samples sharing the timestamp just below t.
    let lo = times[..hi].partition_point(|&x| x < times[hi - 1]);
    if hi == times.len() {
        return Some(lo);
    }
    if (t - times[lo]).abs() <= (times[hi] - t).abs() {
        Some(lo)
    } else {
        Some(hi)
    }
}

/// Linear-scan version of [`nearest_sample`]; same result, O(n).
pub fn nearest_sample_scan(times: &[f64], t: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in times.iter().enumerate() {
        let d = (x - t).abs();
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Aligned, coded events of one recording.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTable {
    /// In marker order.
    pub events: Vec<Event>,
    /// Sorted unique labels; `events[k].code` indexes this.
    pub legend: Vec<String>,
}

impl EventTable {
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.legend.iter().position(|l| l == label)
    }

    /// Samples of all events with the given code, in marker order.
    pub fn samples_with(&self, code: usize) -> Vec<usize> {
        self.events.iter().filter(|e| e.code == code).map(|e| e.sample).collect()
    }

    /// Events whose code is any of `codes`, in marker order.
    pub fn filter_codes(&self, codes: &[usize]) -> Vec<Event> {
        self.events.iter().copied().filter(|e| codes.contains(&e.code)).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Place every marker on the continuous stream sampled at `times`.
///
/// Returns an empty table when `times` is empty.
pub fn align_markers(times: &[f64], markers: &[Marker]) -> EventTable {
    let legend: Vec<String> = markers
        .iter()
        .map(|m| m.label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let events = markers
        .iter()
        .filter_map(|m| {
            let sample = nearest_sample(times, m.time)?;
            // Every label is in the legend by construction.
            let code = legend.binary_search(&m.label).ok()?;
            Some(Event { sample, code })
        })
        .collect();

    EventTable { events, legend }
}
