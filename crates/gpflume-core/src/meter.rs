//! Production-rate meter with sampled logging.
//!
//! Purely observational: feeds operator logs, never affects admission.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// EWMA tick interval
const TICK: Duration = Duration::from_secs(5);

/// Smoothing factor for a one-minute decaying average at 5s ticks
const ONE_MINUTE_ALPHA: f64 = 1.0 - 0.920_044_414_629_323_3; // 1 - exp(-5/60)

struct MeterState {
    started: Instant,
    last_tick: Instant,
    rate_1m: f64,
    uncounted: u64,
}

impl MeterState {
    fn fresh() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_tick: now,
            rate_1m: 0.0,
            uncounted: 0,
        }
    }

    fn tick_if_due(&mut self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < TICK {
            return;
        }
        let ticks = (elapsed.as_secs() / TICK.as_secs()) as u32;
        self.apply_ticks(ticks);
        self.last_tick += TICK * ticks;
    }

    /// Fold `ticks` elapsed 5s intervals into the decaying average.
    ///
    /// The first interval takes the buffered marks; the rest saw none
    /// and decay in closed form, so a long-idle meter doesn't loop once
    /// per interval.
    fn apply_ticks(&mut self, ticks: u32) {
        let instant_rate = self.uncounted as f64 / TICK.as_secs_f64();
        self.uncounted = 0;
        self.rate_1m += ONE_MINUTE_ALPHA * (instant_rate - self.rate_1m);
        if ticks > 1 {
            self.rate_1m *= (1.0 - ONE_MINUTE_ALPHA).powi(ticks as i32 - 1);
        }
    }
}

/// Counts marked records and logs one-minute / mean rates every
/// `sample_interval` marks. A zero interval disables the meter entirely:
/// [`mark`](RateMeter::mark) becomes a no-op.
pub struct RateMeter {
    sample_interval: u64,
    count: AtomicU64,
    state: Mutex<MeterState>,
}

impl RateMeter {
    pub fn new(sample_interval: u64) -> Self {
        Self {
            sample_interval,
            count: AtomicU64::new(0),
            state: Mutex::new(MeterState::fresh()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sample_interval > 0
    }

    /// Total records marked since the last reset
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Discard all state; called on every adapter start
    pub fn reset(&self) {
        if !self.is_enabled() {
            return;
        }
        self.count.store(0, Ordering::Relaxed);
        *self.state.lock().unwrap() = MeterState::fresh();
    }

    /// Record one produced record; logs rates every Nth call.
    pub fn mark(&self) {
        if !self.is_enabled() {
            return;
        }
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.state.lock().unwrap();
        state.uncounted += 1;
        if n % self.sample_interval == 0 {
            state.tick_if_due();
            let mean = n as f64 / state.started.elapsed().as_secs_f64().max(f64::EPSILON);
            log::info!(
                "meter: one-minute rate = {:.2}/s, mean rate = {:.2}/s ({n} records)",
                state.rate_1m,
                mean
            );
        }
    }

    /// Decaying one-minute rate in records/second
    pub fn one_minute_rate(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        state.tick_if_due();
        state.rate_1m
    }

    /// Lifetime mean rate in records/second
    pub fn mean_rate(&self) -> f64 {
        let state = self.state.lock().unwrap();
        self.count() as f64 / state.started.elapsed().as_secs_f64().max(f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_meter_is_noop() {
        let meter = RateMeter::new(0);
        assert!(!meter.is_enabled());
        meter.mark();
        meter.mark();
        assert_eq!(meter.count(), 0);
    }

    #[test]
    fn enabled_meter_counts() {
        let meter = RateMeter::new(10);
        for _ in 0..25 {
            meter.mark();
        }
        assert_eq!(meter.count(), 25);
    }

    #[test]
    fn reset_clears_count() {
        let meter = RateMeter::new(1);
        meter.mark();
        meter.mark();
        meter.reset();
        assert_eq!(meter.count(), 0);
    }

    #[test]
    fn mean_rate_is_positive_after_marks() {
        let meter = RateMeter::new(1);
        for _ in 0..100 {
            meter.mark();
        }
        assert!(meter.mean_rate() > 0.0);
    }

    #[test]
    fn one_minute_rate_starts_at_zero() {
        let meter = RateMeter::new(1);
        assert_eq!(meter.one_minute_rate(), 0.0);
    }

    #[test]
    fn hour_of_idle_ticks_decays_to_zero_in_one_step() {
        let mut state = MeterState::fresh();
        state.rate_1m = 10.0;
        state.uncounted = 500;

        let started = Instant::now();
        state.apply_ticks(720); // an hour at 5s per tick

        // Closed-form decay: no per-interval looping, result ~zero
        assert!(state.rate_1m.abs() < 1e-9);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(state.uncounted, 0);
    }

    #[test]
    fn single_tick_folds_uncounted_marks() {
        let mut state = MeterState::fresh();
        state.uncounted = 50;

        state.apply_ticks(1);

        // Rate moves toward 50 marks / 5s = 10/s
        let expected = ONE_MINUTE_ALPHA * 10.0;
        assert!((state.rate_1m - expected).abs() < 1e-9);
        assert_eq!(state.uncounted, 0);
    }

    #[test]
    fn two_ticks_match_stepwise_decay() {
        let mut stepwise = MeterState::fresh();
        stepwise.uncounted = 50;
        stepwise.apply_ticks(1);
        stepwise.apply_ticks(1);

        let mut closed = MeterState::fresh();
        closed.uncounted = 50;
        closed.apply_ticks(2);

        assert!((stepwise.rate_1m - closed.rate_1m).abs() < 1e-12);
    }
}
