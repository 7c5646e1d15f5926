//! Named-interval stopwatch used to instrument the pipeline.
//!
//! A `Stopwatch` is an explicit value owned by the batch runner and threaded by
//! `&mut` into the stages that record timings. Labels identify intervals
//! (`"Audio Extraction"`, `"Transcription"`, one label per processed file);
//! `summary()` reports them in first-start order.
//!
//! Invariant: a label must be stopped before it is started again. Misuse is
//! not fatal — a double start restarts the interval with a warning, and a stop
//! without a matching start is ignored with a warning — so instrumentation can
//! never take the pipeline down.

use std::time::{Duration, Instant};

use tracing::warn;

/// One recorded label: accumulated duration plus the in-flight start, if any.
struct Lap {
    label: String,
    total: Duration,
    started: Option<Instant>,
}

/// A completed (label, duration) pair as reported by [`Stopwatch::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapSummary {
    pub label: String,
    pub total: Duration,
}

/// Records start/stop pairs per label and produces a summary report.
#[derive(Default)]
pub struct Stopwatch {
    // Vec, not a map: summary order is first-start order and label counts stay small.
    laps: Vec<Lap>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing `label`. Restarts (and warns) if the label is already running.
    pub fn start(&mut self, label: &str) {
        let now = Instant::now();

        if let Some(lap) = self.laps.iter_mut().find(|l| l.label == label) {
            if lap.started.is_some() {
                warn!("stopwatch label '{label}' started while already running; restarting");
            }
            lap.started = Some(now);
            return;
        }

        self.laps.push(Lap {
            label: label.to_owned(),
            total: Duration::ZERO,
            started: Some(now),
        });
    }

    /// Stop timing `label`, accumulating into its total.
    pub fn stop(&mut self, label: &str) {
        let now = Instant::now();

        let Some(lap) = self.laps.iter_mut().find(|l| l.label == label) else {
            warn!("stopwatch label '{label}' stopped without being started");
            return;
        };

        match lap.started.take() {
            Some(started) => lap.total += now.duration_since(started),
            None => warn!("stopwatch label '{label}' stopped without being started"),
        }
    }

    /// Completed intervals in first-start order.
    ///
    /// Labels still running are excluded; only stopped time is reported.
    pub fn summary(&self) -> Vec<LapSummary> {
        self.laps
            .iter()
            .filter(|lap| lap.total > Duration::ZERO || lap.started.is_none())
            .map(|lap| LapSummary {
                label: lap.label.clone(),
                total: lap.total,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_in_first_start_order() {
        let mut sw = Stopwatch::new();
        sw.start("b");
        sw.stop("b");
        sw.start("a");
        sw.stop("a");

        let labels: Vec<&str> = sw.summary().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn reused_label_accumulates_into_one_entry() {
        let mut sw = Stopwatch::new();
        sw.start("x");
        sw.stop("x");
        sw.start("x");
        sw.stop("x");

        let summary = sw.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].label, "x");
    }

    #[test]
    fn running_label_is_not_reported() {
        let mut sw = Stopwatch::new();
        sw.start("pending");
        assert!(sw.summary().is_empty());

        sw.stop("pending");
        assert_eq!(sw.summary().len(), 1);
    }

    #[test]
    fn stop_without_start_is_a_noop() {
        let mut sw = Stopwatch::new();
        sw.stop("never-started");
        assert!(sw.summary().is_empty());
    }

    #[test]
    fn double_start_restarts_instead_of_panicking() {
        let mut sw = Stopwatch::new();
        sw.start("x");
        sw.start("x");
        sw.stop("x");
        assert_eq!(sw.summary().len(), 1);
    }
}
