//! Frame loop driving [`SimulationState::tick`]
//!
//! The host decides how frames are produced (fixed step for batch runs, wall
//! clock pacing for live output); the loop itself is the same either way.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use super::state::{FrameSnapshot, SimulationState};

/// Produces the wall-clock delta for each frame, or `None` when done
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<f64>;
}

/// Fixed wall delta per frame, no sleeping
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    delta_seconds: f64,
    remaining: Option<u64>,
}

impl FixedTimestep {
    /// `frames = None` runs until the consumer breaks
    pub fn new(delta_seconds: f64, frames: Option<u64>) -> Self {
        Self {
            delta_seconds,
            remaining: frames,
        }
    }
}

impl FrameSource for FixedTimestep {
    fn next_frame(&mut self) -> Option<f64> {
        match self.remaining.as_mut() {
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(self.delta_seconds)
            }
            None => Some(self.delta_seconds),
        }
    }
}

/// Sleeps to a target frame rate and reports the real elapsed time
#[derive(Debug, Clone)]
pub struct WallClockPacer {
    interval: Duration,
    last: Option<Instant>,
    remaining: Option<u64>,
}

impl WallClockPacer {
    pub fn new(max_fps: f64, frames: Option<u64>) -> Self {
        let fps = if max_fps.is_finite() && max_fps > 0.0 {
            max_fps
        } else {
            60.0
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / fps),
            last: None,
            remaining: frames,
        }
    }
}

impl FrameSource for WallClockPacer {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(n) = self.remaining.as_mut() {
            if *n == 0 {
                return None;
            }
            *n -= 1;
        }

        let now = match self.last {
            None => Instant::now(),
            Some(last) => {
                let target = last + self.interval;
                let now = Instant::now();
                if target > now {
                    std::thread::sleep(target - now);
                }
                Instant::now()
            }
        };

        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last = Some(now);
        Some(delta)
    }
}

/// Run frames until the source is exhausted or `on_frame` breaks.
///
/// Each frame is strictly sequential: clock tick, one propagation per body,
/// then the consumer. Returns the number of frames run.
pub fn run<S, F>(state: &mut SimulationState, source: &mut S, mut on_frame: F) -> u64
where
    S: FrameSource,
    F: FnMut(&mut SimulationState, &FrameSnapshot) -> ControlFlow<()>,
{
    let mut frames = 0;
    while let Some(delta) = source.next_frame() {
        let snapshot = state.tick(delta);
        frames += 1;
        if on_frame(state, &snapshot).is_break() {
            break;
        }
    }
    log::debug!("Frame loop finished after {} frames", frames);
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::PropagationConfig;
    use crate::sim::clock::SimulationClock;
    use crate::sim::state::ControlEvent;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn state() -> SimulationState {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SimulationState::new(SimulationClock::new(start), PropagationConfig::default())
    }

    #[test]
    fn test_fixed_timestep_runs_requested_frames() {
        let mut state = state();
        let start = state.clock().simulated_time();
        let mut source = FixedTimestep::new(0.5, Some(4));

        let mut seen = Vec::new();
        let frames = run(&mut state, &mut source, |_, snapshot| {
            seen.push(snapshot.frame);
            ControlFlow::Continue(())
        });

        assert_eq!(frames, 4);
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(
            state.clock().simulated_time(),
            start + ChronoDuration::seconds(2)
        );
    }

    #[test]
    fn test_consumer_can_stop_and_send_events() {
        let mut state = state();
        let start = state.clock().simulated_time();
        let mut source = FixedTimestep::new(1.0, None);

        let frames = run(&mut state, &mut source, |state, snapshot| {
            if snapshot.frame == 2 {
                state.apply(ControlEvent::Pause);
            }
            if snapshot.frame == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(frames, 5);
        // Frames 1 and 2 advanced; the pause froze 3 to 5
        assert_eq!(
            state.clock().simulated_time(),
            start + ChronoDuration::seconds(2)
        );
    }

    #[test]
    fn test_wall_clock_pacer_first_frame_is_zero() {
        let mut pacer = WallClockPacer::new(1000.0, Some(2));
        assert_eq!(pacer.next_frame(), Some(0.0));
        let second = pacer.next_frame().unwrap();
        assert!(second > 0.0);
        assert_eq!(pacer.next_frame(), None);
    }
}
