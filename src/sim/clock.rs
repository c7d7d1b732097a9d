//! Simulation clock with playback rate, pause and time jumps

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Playback presets walked by [`SimulationClock::step_rate`]
pub const DEFAULT_RATE_PRESETS: [f64; 10] = [
    -10000.0, -1000.0, -100.0, -10.0, -1.0, 1.0, 10.0, 100.0, 1000.0, 10000.0,
];

/// Above this many seconds a single advance is applied with millisecond
/// resolution, since nanoseconds no longer fit in an i64.
const NANOSECOND_RANGE_SECONDS: f64 = 9.0e9;

/// Running state derived from the playback rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockState {
    Running { rate: f64 },
    Paused,
}

/// Map a linear slider value `v` to a playback rate of `2^v`.
///
/// The result is always positive; pausing is a separate toggle.
pub fn rate_from_slider(value: f64) -> f64 {
    2f64.powf(value)
}

/// Owns the simulated "current time".
///
/// `simulated_time` only changes in [`tick`](Self::tick),
/// [`tick_wall`](Self::tick_wall) and [`set_time`](Self::set_time), so every
/// reader between two ticks sees the same instant.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    simulated_time: DateTime<Utc>,
    /// Signed multiplier; 0 means paused, negative runs backwards
    playback_rate: f64,
    /// Rate restored by `resume` after a pause
    resume_rate: f64,
    /// Wall-clock instant of the last `tick_wall` call
    last_wall_tick: Option<Instant>,
    rate_presets: Vec<f64>,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl SimulationClock {
    /// Clock at `start`, running in real time
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            simulated_time: start,
            playback_rate: 1.0,
            resume_rate: 1.0,
            last_wall_tick: None,
            rate_presets: DEFAULT_RATE_PRESETS.to_vec(),
        }
    }

    /// Start at the current UTC time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn simulated_time(&self) -> DateTime<Utc> {
        self.simulated_time
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn last_wall_tick(&self) -> Option<Instant> {
        self.last_wall_tick
    }

    pub fn state(&self) -> ClockState {
        if self.playback_rate == 0.0 {
            ClockState::Paused
        } else {
            ClockState::Running {
                rate: self.playback_rate,
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.playback_rate == 0.0
    }

    /// Jump to any instant. Running/paused state is unchanged.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        log::debug!("Simulation time set to {}", time);
        self.simulated_time = time;
    }

    /// Change the playback rate. Zero pauses; non-finite rates are ignored.
    pub fn set_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            log::warn!("Ignoring non-finite playback rate {}", rate);
            return;
        }
        self.playback_rate = rate;
        if rate != 0.0 {
            self.resume_rate = rate;
        }
    }

    /// Apply a slider value through the `2^v` encoding
    pub fn set_rate_from_slider(&mut self, value: f64) {
        self.set_rate(rate_from_slider(value));
    }

    pub fn pause(&mut self) {
        self.playback_rate = 0.0;
    }

    /// Restore the last non-zero rate
    pub fn resume(&mut self) {
        self.playback_rate = self.resume_rate;
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Flip the direction of playback, keeping the magnitude
    pub fn reverse(&mut self) {
        self.resume_rate = -self.resume_rate;
        if !self.is_paused() {
            self.playback_rate = self.resume_rate;
        }
    }

    /// Advance by a wall-clock delta in seconds.
    ///
    /// Paused clocks do not move. Negative or non-finite deltas count as zero.
    pub fn tick(&mut self, wall_delta_seconds: f64) -> DateTime<Utc> {
        if !wall_delta_seconds.is_finite() || wall_delta_seconds < 0.0 {
            log::trace!("Discarding wall delta {}", wall_delta_seconds);
            return self.simulated_time;
        }
        if self.is_paused() {
            return self.simulated_time;
        }

        let advance = wall_delta_seconds * self.playback_rate;
        match duration_from_seconds(advance)
            .and_then(|delta| self.simulated_time.checked_add_signed(delta))
        {
            Some(time) => self.simulated_time = time,
            None => log::warn!(
                "Simulation time overflow advancing {} s from {}",
                advance,
                self.simulated_time
            ),
        }
        self.simulated_time
    }

    /// Advance using the wall time elapsed since the previous call.
    ///
    /// The first call only records `now`.
    pub fn tick_wall(&mut self, now: Instant) -> DateTime<Utc> {
        let delta = self
            .last_wall_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_wall_tick = Some(now);
        self.tick(delta)
    }

    /// Move the rate magnitude to the neighbouring preset above
    /// (`direction > 0`) or below, keeping the playback direction. A rate
    /// between presets goes to the nearest preset on that side; at either
    /// end the rate is unchanged. Unpauses.
    pub fn step_rate(&mut self, direction: i32) {
        let current = self.resume_rate.abs();
        let tolerance = current * 1e-9;
        let magnitudes = self.rate_presets.iter().map(|rate| rate.abs());

        let target = match direction.signum() {
            1 => magnitudes
                .filter(|m| *m > current + tolerance)
                .min_by(f64::total_cmp),
            -1 => magnitudes
                .filter(|m| *m > 0.0 && *m < current - tolerance)
                .max_by(f64::total_cmp),
            _ => None,
        };

        let sign = self.resume_rate.signum();
        self.set_rate(target.unwrap_or(current) * sign);
    }

    /// Current time as `YYYY/MM/DD hh:mm:ss UTC`
    pub fn format_time(&self) -> String {
        format_time(self.simulated_time)
    }

    pub fn format_rate(&self) -> String {
        format_rate(self.playback_rate)
    }
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y/%m/%d %H:%M:%S UTC").to_string()
}

pub fn format_rate(rate: f64) -> String {
    if rate == 0.0 {
        "Paused".to_string()
    } else if rate.abs() >= 1.0 && rate.fract() == 0.0 {
        format!("{:.0}x", rate)
    } else {
        format!("{:.2}x", rate)
    }
}

fn duration_from_seconds(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() {
        return None;
    }
    if seconds.abs() < NANOSECOND_RANGE_SECONDS {
        Some(Duration::nanoseconds((seconds * 1e9).round() as i64))
    } else {
        Duration::try_milliseconds((seconds * 1000.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 3, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_tick_scales_by_rate() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(2.0);
        clock.tick(1.0);
        clock.tick(1.0);
        assert_eq!(clock.simulated_time(), t0() + Duration::seconds(4));
    }

    #[test]
    fn test_paused_clock_does_not_move() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(0.0);
        assert_eq!(clock.state(), ClockState::Paused);
        for _ in 0..100 {
            clock.tick(0.016);
        }
        assert_eq!(clock.simulated_time(), t0());
    }

    #[test]
    fn test_reverse_playback() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(-60.0);
        clock.tick(0.5);
        assert_eq!(clock.simulated_time(), t0() - Duration::seconds(30));

        clock.reverse();
        assert_eq!(clock.playback_rate(), 60.0);
        clock.tick(0.5);
        assert_eq!(clock.simulated_time(), t0());
    }

    #[test]
    fn test_set_time_keeps_state() {
        let mut clock = SimulationClock::new(t0());
        clock.pause();
        let target = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        clock.set_time(target);
        assert_eq!(clock.simulated_time(), target);
        assert!(clock.is_paused());

        clock.resume();
        clock.set_time(t0());
        assert_eq!(clock.state(), ClockState::Running { rate: 1.0 });
    }

    #[test]
    fn test_pause_resume_restores_rate() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate_from_slider(3.0);
        assert_eq!(clock.playback_rate(), 8.0);

        clock.toggle_pause();
        assert!(clock.is_paused());
        clock.toggle_pause();
        assert_eq!(clock.playback_rate(), 8.0);
    }

    #[test]
    fn test_rate_from_slider_is_exponential() {
        assert_eq!(rate_from_slider(0.0), 1.0);
        assert_eq!(rate_from_slider(10.0), 1024.0);
        assert_eq!(rate_from_slider(-1.0), 0.5);
        assert!(rate_from_slider(-50.0) > 0.0);
    }

    #[test]
    fn test_invalid_inputs_are_ignored() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(f64::NAN);
        assert_eq!(clock.playback_rate(), 1.0);

        clock.tick(-5.0);
        clock.tick(f64::INFINITY);
        assert_eq!(clock.simulated_time(), t0());
    }

    #[test]
    fn test_tick_wall_uses_elapsed_wall_time() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(10.0);

        let start = Instant::now();
        clock.tick_wall(start);
        assert_eq!(clock.simulated_time(), t0());

        clock.tick_wall(start + std::time::Duration::from_millis(250));
        assert_eq!(clock.simulated_time(), t0() + Duration::milliseconds(2500));
    }

    #[test]
    fn test_step_rate_walks_presets() {
        let mut clock = SimulationClock::new(t0());
        clock.step_rate(1);
        assert_eq!(clock.playback_rate(), 10.0);
        clock.step_rate(1);
        clock.step_rate(1);
        clock.step_rate(1);
        clock.step_rate(1);
        assert_eq!(clock.playback_rate(), 10000.0);

        clock.set_rate(-100.0);
        clock.step_rate(-1);
        assert_eq!(clock.playback_rate(), -10.0);

        clock.pause();
        clock.step_rate(1);
        assert_eq!(clock.playback_rate(), -100.0);
    }

    #[test]
    fn test_step_rate_between_presets_and_at_ends() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(5.0);
        clock.step_rate(-1);
        assert_eq!(clock.playback_rate(), 1.0);
        clock.step_rate(-1);
        assert_eq!(clock.playback_rate(), 1.0);

        clock.set_rate(-5.0);
        clock.step_rate(1);
        assert_eq!(clock.playback_rate(), -10.0);

        clock.set_rate(10000.0);
        clock.step_rate(1);
        assert_eq!(clock.playback_rate(), 10000.0);
    }

    #[test]
    fn test_large_advance_does_not_panic() {
        let mut clock = SimulationClock::new(t0());
        clock.set_rate(1.0e12);
        clock.tick(1.0);
        assert!(clock.simulated_time() > t0());

        clock.set_rate(1.0e300);
        let before = clock.simulated_time();
        clock.tick(1.0);
        assert_eq!(clock.simulated_time(), before);
    }

    #[test]
    fn test_formatting() {
        let clock = SimulationClock::new(t0());
        assert_eq!(clock.format_time(), "2024/09/03 12:00:00 UTC");
        assert_eq!(format_rate(0.0), "Paused");
        assert_eq!(format_rate(-1000.0), "-1000x");
        assert_eq!(format_rate(8.0), "8x");
        assert_eq!(format_rate(0.5), "0.50x");
    }
}
