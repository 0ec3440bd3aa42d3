use crate::utils::SolverError;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::OpenOptions,
    io::Write,
    time::{Duration, Instant},
};

/// Wall-clock stopwatch owned by a solver instance.
///
/// Each engine and driver owns its own `Stopwatch`; there is no process-wide
/// clock state. Elapsed time accumulates into the owner's `runtime` across
/// repeated `solve()` calls.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Creates a stopwatch that starts running immediately.
    pub fn new() -> Self {
        Stopwatch {
            start: Instant::now(),
        }
    }

    /// Restarts the stopwatch from zero.
    pub fn start(&mut self) {
        self.start = Instant::now();
    }

    /// Returns the elapsed time in seconds since the last start.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Returns the elapsed time in seconds and restarts the stopwatch, so
    /// the returned interval is not counted again by a later reading.
    pub fn elapsed_reset(&mut self) -> f64 {
        let t = self.elapsed();
        self.start = Instant::now();
        t
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Stopwatch::new()
    }
}

/// A record of timing information for an ADMM algorithm step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Name of the ADMM step (e.g., "update_primal", "update_auxiliary")
    pub step_name: String,
    /// The iteration number when this step was executed
    pub iteration: usize,
    /// Duration of the step in milliseconds
    pub duration_ms: f64,
}

/// Performance tracking for the per-step breakdown of ADMM iterations.
///
/// `TimingTracker` collects timing records for the individual update steps
/// inside each iteration and provides statistical analysis and CSV export
/// for bottleneck identification. It is used internally by `AdmmSolver`.
#[derive(Debug, Default)]
pub struct TimingTracker {
    /// Collection of step timing records
    step_timings: Vec<TimingRecord>,
    /// Current iteration number for new recordings
    current_iteration: usize,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self {
            step_timings: Vec::new(),
            current_iteration: 0,
        }
    }

    pub fn start_iteration(&mut self, iteration: usize) {
        self.current_iteration = iteration;
    }

    pub fn record_step(&mut self, step_name: &str, duration: Duration) {
        let record = TimingRecord {
            step_name: step_name.to_string(),
            iteration: self.current_iteration,
            duration_ms: duration.as_secs_f64() * 1000.0,
        };
        self.step_timings.push(record);
    }

    pub fn step_timings(&self) -> &[TimingRecord] {
        &self.step_timings
    }

    /// Per-step statistics as a map from step name to (average ms, max ms, count).
    pub fn step_statistics(&self) -> HashMap<String, (f64, f64, usize)> {
        let mut stats = HashMap::new();

        for record in &self.step_timings {
            let entry = stats
                .entry(record.step_name.clone())
                .or_insert((0.0f64, 0.0f64, 0));
            entry.0 += record.duration_ms;
            entry.1 = entry.1.max(record.duration_ms);
            entry.2 += 1;
        }

        // Convert totals to averages
        for (_, entry) in stats.iter_mut() {
            entry.0 /= entry.2 as f64;
        }

        stats
    }

    pub fn write_step_timings_to_csv(&self, filename: &str) -> Result<(), SolverError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(filename)?;

        writeln!(file, "step_name,iteration,duration_ms")?;

        for record in &self.step_timings {
            writeln!(
                file,
                "{},{},{:.3}",
                record.step_name, record.iteration, record.duration_ms
            )?;
        }

        Ok(())
    }
}

/// Runs a step closure and records its duration under the given name.
pub fn time_step<F, R>(tracker: &mut TimingTracker, name: &str, f: F) -> Result<R, SolverError>
where
    F: FnOnce() -> Result<R, SolverError>,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    tracker.record_step(name, duration);
    result
}
