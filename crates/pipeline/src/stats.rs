use std::collections::VecDeque;
use std::time::Duration;

/// Cost and volume of one dispatcher tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSample {
    pub elapsed: Duration,
    pub drained: usize,
    pub applied: usize,
}

/// Recent dispatcher ticks measured against the tick budget.
///
/// Keeps the last `window` samples for averages, plus lifetime counters
/// for ticks and budget overruns.
#[derive(Debug, Clone)]
pub struct TickTimer {
    budget: Duration,
    window: usize,
    samples: VecDeque<TickSample>,
    ticks: u64,
    overruns: u64,
}

impl TickTimer {
    pub fn new(budget: Duration, window: usize) -> Self {
        let window = window.max(1);
        Self {
            budget,
            window,
            samples: VecDeque::with_capacity(window),
            ticks: 0,
            overruns: 0,
        }
    }

    /// Record a tick. Returns true when it took longer than the budget.
    pub fn record(&mut self, sample: TickSample) -> bool {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.ticks += 1;
        let overran = sample.elapsed > self.budget;
        if overran {
            self.overruns += 1;
        }
        overran
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Ticks recorded since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that exceeded the budget since creation.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn last(&self) -> Option<TickSample> {
        self.samples.back().copied()
    }

    pub fn average_elapsed(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().map(|s| s.elapsed).sum::<Duration>() / self.samples.len() as u32
    }

    pub fn max_elapsed(&self) -> Duration {
        self.samples
            .iter()
            .map(|s| s.elapsed)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Mean commands drained per tick over the window.
    pub fn drained_per_tick(&self) -> f64 {
        self.mean(|s| s.drained)
    }

    /// Mean commands applied per tick over the window.
    pub fn applied_per_tick(&self) -> f64 {
        self.mean(|s| s.applied)
    }

    /// Share of the budget used by the windowed average tick.
    pub fn budget_load(&self) -> f64 {
        if self.budget.is_zero() {
            return 0.0;
        }
        self.average_elapsed().as_secs_f64() / self.budget.as_secs_f64()
    }

    fn mean(&self, field: impl Fn(&TickSample) -> usize) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(field).sum::<usize>() as f64 / self.samples.len() as f64
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64, drained: usize, applied: usize) -> TickSample {
        TickSample {
            elapsed: Duration::from_millis(ms),
            drained,
            applied,
        }
    }

    #[test]
    fn fresh_timer_reports_nothing() {
        let timer = TickTimer::new(Duration::from_millis(50), 8);
        assert_eq!(timer.ticks(), 0);
        assert_eq!(timer.last(), None);
        assert_eq!(timer.average_elapsed(), Duration::ZERO);
        assert_eq!(timer.drained_per_tick(), 0.0);
        assert_eq!(timer.budget_load(), 0.0);
    }

    #[test]
    fn overruns_are_counted_against_budget() {
        let mut timer = TickTimer::new(Duration::from_millis(50), 8);
        assert!(!timer.record(sample(10, 4, 4)));
        assert!(!timer.record(sample(50, 4, 4)));
        assert!(timer.record(sample(51, 4, 4)));
        assert_eq!(timer.overruns(), 1);
        assert_eq!(timer.ticks(), 3);
    }

    #[test]
    fn throughput_averages_over_window() {
        let mut timer = TickTimer::new(Duration::from_millis(100), 2);
        timer.record(sample(10, 100, 90));
        timer.record(sample(20, 10, 8));
        timer.record(sample(40, 30, 2));

        // Oldest sample fell out; lifetime counters keep it.
        assert_eq!(timer.ticks(), 3);
        assert_eq!(timer.drained_per_tick(), 20.0);
        assert_eq!(timer.applied_per_tick(), 5.0);
        assert_eq!(timer.average_elapsed(), Duration::from_millis(30));
        assert_eq!(timer.max_elapsed(), Duration::from_millis(40));
        assert!((timer.budget_load() - 0.3).abs() < 1e-9);
        assert_eq!(timer.last(), Some(sample(40, 30, 2)));
    }
}
