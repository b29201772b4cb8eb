//! Paced replay of recorded sessions.
//!
//! Replays the marker and EEG streams of a recording in (approximately) real
//! time, so downstream consumers can be exercised without the experiment
//! running.  Time zero is the first marker:
//!
//! ```text
//! markers   ·─────────·────────────·──────·        t_rel = t − t_marker[0]
//! eeg     ┄┄┄┄┄┄┄┃┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄
//!                └ cursor starts at the last sample with t_rel ≤ 0
//! ```
//!
//! Every tick the loop reads the [`Clock`], pushes all markers and samples
//! whose relative time has passed, then sleeps for `tick_ms`.  It stops once
//! the last marker went out.  Samples are never re-emitted.
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::config::ReplayConfig;
use crate::error::Result;
use crate::recording::{self, Recording, Sample};

/// Sink for replayed samples.
pub trait Outlet {
    fn push(&mut self, sample: Sample<'_>) -> Result<()>;
}

/// Time source of the replay loop.
pub trait Clock {
    /// Restart the clock at zero.
    fn start(&mut self);
    /// Seconds since the last [`start`](Self::start).
    fn elapsed(&self) -> f64;
    fn sleep(&mut self, d: Duration);
}

/// [`Clock`] backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for WallClock {
    fn start(&mut self) {
        self.origin = Instant::now();
    }

    fn elapsed(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Writes each sample as one JSON object per line:
/// `{"stream":"Game State","values":["Monster left"]}`.
#[derive(Debug)]
pub struct JsonLinesOutlet<W: Write> {
    stream: String,
    out: W,
}

impl<W: Write> JsonLinesOutlet<W> {
    pub fn new(stream: impl Into<String>, out: W) -> Self {
        Self { stream: stream.into(), out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Outlet for JsonLinesOutlet<W> {
    fn push(&mut self, sample: Sample<'_>) -> Result<()> {
        let values = match sample {
            Sample::Numeric(v) => serde_json::json!(v.to_vec()),
            Sample::Text(v) => serde_json::json!(v),
        };
        let line = serde_json::json!({ "stream": self.stream, "values": values });
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// Relative timestamps plus a cursor of what has been emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySchedule {
    times: Vec<f64>,
    next: usize,
}

impl ReplaySchedule {
    /// `times` must be non-decreasing; emission starts at index `first`.
    pub fn new(times: Vec<f64>, first: usize) -> Self {
        Self { next: first.min(times.len()), times }
    }

    /// Indices that became due by `elapsed` and were not emitted yet.
    pub fn due(&mut self, elapsed: f64) -> Range<usize> {
        let target = self.times.partition_point(|&t| t <= elapsed).max(self.next);
        let range = self.next..target;
        self.next = target;
        range
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.times.len()
    }

    pub fn remaining(&self) -> usize {
        self.times.len() - self.next
    }

    /// Relative time of the last entry.
    pub fn duration(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// What one replay pushed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReplayStats {
    pub markers: usize,
    pub samples: usize,
    /// Clock time at the end of the replay, seconds.
    pub elapsed: f64,
}

/// Replay one loaded recording.
pub fn replay_recording(
    rec: &Recording,
    cfg: &ReplayConfig,
    marker_outlet: &mut dyn Outlet,
    eeg_outlet: &mut dyn Outlet,
    clock: &mut dyn Clock,
) -> Result<ReplayStats> {
    let markers = rec.require(&cfg.streams.markers)?;
    let eeg = rec.require(&cfg.streams.eeg)?;

    let Some(&t0) = markers.timestamps.first() else {
        log::warn!("marker stream '{}' is empty, nothing to replay", markers.name());
        return Ok(ReplayStats::default());
    };
    let mut marker_sched = ReplaySchedule::new(markers.timestamps.iter().map(|t| t - t0).collect(), 0);
    let eeg_times: Vec<f64> = eeg.timestamps.iter().map(|t| t - t0).collect();
    let first_eeg = eeg_times.partition_point(|&t| t <= 0.0).saturating_sub(1);
    let mut eeg_sched = ReplaySchedule::new(eeg_times, first_eeg);

    let total = marker_sched.duration();
    let tick = Duration::from_millis(cfg.tick_ms);
    let mut stats = ReplayStats::default();
    let mut next_progress = cfg.progress_secs;

    clock.start();
    loop {
        let now = clock.elapsed();
        for i in marker_sched.due(now) {
            marker_outlet.push(markers.sample(i))?;
            stats.markers += 1;
        }
        for i in eeg_sched.due(now) {
            eeg_outlet.push(eeg.sample(i))?;
            stats.samples += 1;
        }
        if cfg.progress_secs > 0.0 && now >= next_progress {
            log::info!("streamed {now:.0} s of {total:.0} s");
            while next_progress <= now {
                next_progress += cfg.progress_secs;
            }
        }
        if marker_sched.is_done() {
            stats.elapsed = now;
            break;
        }
        clock.sleep(tick);
    }
    Ok(stats)
}

/// Replay every file of `cfg` in order.
///
/// With `cfg.auto == false`, `wait_for_start` is called before each file.
pub fn replay_files(
    cfg: &ReplayConfig,
    marker_outlet: &mut dyn Outlet,
    eeg_outlet: &mut dyn Outlet,
    clock: &mut dyn Clock,
    wait_for_start: &mut dyn FnMut(&Path) -> Result<()>,
) -> Result<Vec<ReplayStats>> {
    let mut all = Vec::new();
    for path in cfg.file_paths() {
        log::info!("reading {}", path.display());
        let rec = recording::load_with(&path, &cfg.load)?;
        if !cfg.auto {
            wait_for_start(&path)?;
        }
        let stats = replay_recording(&rec, cfg, marker_outlet, eeg_outlet, clock)?;
        log::info!(
            "{}: {} marker(s), {} sample(s) in {:.1} s",
            path.display(),
            stats.markers,
            stats.samples,
            stats.elapsed
        );
        all.push(stats);
    }
    log::info!("streaming complete");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_never_reemits() {
        let mut s = ReplaySchedule::new(vec![0.0, 0.5, 1.0, 1.0, 2.0], 0);
        assert_eq!(s.due(-1.0), 0..0);
        assert_eq!(s.due(0.0), 0..1);
        assert_eq!(s.due(0.0), 1..1);
        assert_eq!(s.due(1.0), 1..4);
        assert_eq!(s.remaining(), 1);
        assert!(!s.is_done());
        // Time going backwards emits nothing.
        assert_eq!(s.due(0.2), 4..4);
        assert_eq!(s.due(10.0), 4..5);
        assert!(s.is_done());
    }

    #[test]
    fn schedule_starts_at_cursor() {
        let mut s = ReplaySchedule::new(vec![-0.2, -0.1, 0.0, 0.1], 2);
        assert_eq!(s.due(0.05), 2..3);
        assert_eq!(ReplaySchedule::new(vec![1.0], 5).remaining(), 0);
    }

    #[test]
    fn json_lines_format() {
        let mut out = JsonLinesOutlet::new("Game State", Vec::new());
        let labels = vec!["Monster left".to_string()];
        out.push(Sample::Text(&labels)).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["stream"], "Game State");
        assert_eq!(v["values"][0], "Monster left");
    }
}
