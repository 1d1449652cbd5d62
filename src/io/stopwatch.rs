//! Wall clock timing for runs and reports.

use std::time::Instant;

/// A simple stopwatch for benchmarking.
///
/// [`Stopwatch::lap`] returns the seconds since the start or the
/// previous lap and records them, [`Stopwatch::elapsed`] peeks without
/// recording.
#[derive(Debug)]
pub struct Stopwatch {
    last: Instant,
    laps: Vec<f64>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Seconds since the start or the last lap.
    pub fn elapsed(&self) -> f64 {
        self.last.elapsed().as_secs_f64()
    }

    /// Records a lap and resets the reference point.
    pub fn lap(&mut self) -> f64 {
        let out = self.last.elapsed().as_secs_f64();
        self.laps.push(out);
        self.last = Instant::now();
        out
    }

    /// All recorded laps in seconds.
    pub fn laps(&self) -> &[f64] {
        &self.laps
    }

    /// Total of the recorded laps.
    pub fn total(&self) -> f64 {
        self.laps.iter().sum()
    }
}
