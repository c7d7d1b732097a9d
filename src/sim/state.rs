//! Top-level simulation state owned by the frame loop

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use super::clock::SimulationClock;
use crate::data::{StatusRecord, VisibilityFilter};
use crate::propagation::{
    greenwich_mean_sidereal_time, seconds_between, Body, BodyState, OrbitTrack, PathFrame,
    PropagationConfig, PropagationEngine,
};

/// User and data events applied between ticks
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    SetRate(f64),
    /// Linear slider value, mapped to `2^v`
    SetRateSlider(f64),
    Pause,
    Resume,
    TogglePause,
    Reverse,
    StepRate(i32),
    SetTime(DateTime<Utc>),
    CategoryChanged { label: String, enabled: bool },
    StatusFeedLoaded(Vec<StatusRecord>),
    StatusFeedFailed,
    BodiesLoaded(Vec<Body>),
}

/// One body as handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFrame {
    pub state: BodyState,
    pub visible: bool,
}

/// Everything a consumer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub simulated_time: DateTime<Utc>,
    pub playback_rate: f64,
    /// Earth rotation angle (GMST, rad) at `simulated_time`
    pub earth_rotation: f64,
    pub bodies: Vec<BodyFrame>,
}

impl FrameSnapshot {
    pub fn visible(&self) -> impl Iterator<Item = &BodyFrame> {
        self.bodies.iter().filter(|b| b.visible)
    }

    pub fn position_of(&self, id: &str) -> Option<Vector3<f64>> {
        self.bodies
            .iter()
            .find(|b| b.state.id == id)
            .map(|b| b.state.position)
    }
}

/// Clock, bodies, paths and visibility in one place.
///
/// The frame loop owns this value and hands out shared references; nothing
/// here is global.
#[derive(Debug, Clone)]
pub struct SimulationState {
    clock: SimulationClock,
    engine: PropagationEngine,
    visibility: VisibilityFilter,
    /// Orbit paths keyed by body id, built when bodies are loaded. Earth-fixed
    /// paths are re-sampled once the clock leaves their one-period window.
    tracks: HashMap<String, OrbitTrack>,
    frame: u64,
}

impl SimulationState {
    pub fn new(clock: SimulationClock, config: PropagationConfig) -> Self {
        Self {
            clock,
            engine: PropagationEngine::new(config),
            visibility: VisibilityFilter::default(),
            tracks: HashMap::new(),
            frame: 0,
        }
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    pub fn visibility(&self) -> &VisibilityFilter {
        &self.visibility
    }

    pub fn track(&self, id: &str) -> Option<&OrbitTrack> {
        self.tracks.get(id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Replace the body set and sample each orbit path once
    pub fn load_bodies(&mut self, bodies: Vec<Body>) {
        self.engine.load_bodies(bodies);
        let reference = self.clock.simulated_time();
        self.tracks = self
            .engine
            .orbit_tracks(reference)
            .into_iter()
            .map(|track| (track.body_id.clone(), track))
            .collect();
    }

    pub fn apply(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::SetRate(rate) => self.clock.set_rate(rate),
            ControlEvent::SetRateSlider(value) => self.clock.set_rate_from_slider(value),
            ControlEvent::Pause => self.clock.pause(),
            ControlEvent::Resume => self.clock.resume(),
            ControlEvent::TogglePause => self.clock.toggle_pause(),
            ControlEvent::Reverse => self.clock.reverse(),
            ControlEvent::StepRate(direction) => self.clock.step_rate(direction),
            ControlEvent::SetTime(time) => {
                self.clock.set_time(time);
                self.refresh_ground_tracks();
            }
            ControlEvent::CategoryChanged { label, enabled } => {
                self.update_visibility(|filter| filter.on_category_changed(&label, enabled));
            }
            ControlEvent::StatusFeedLoaded(records) => {
                self.update_visibility(|filter| filter.on_status_feed_loaded(records));
            }
            ControlEvent::StatusFeedFailed => {
                self.update_visibility(VisibilityFilter::on_status_feed_failed);
            }
            ControlEvent::BodiesLoaded(bodies) => self.load_bodies(bodies),
        }
    }

    /// Run a filter transition against the current visibility state
    pub fn update_visibility<F>(&mut self, transition: F)
    where
        F: FnOnce(VisibilityFilter) -> VisibilityFilter,
    {
        self.visibility = transition(std::mem::take(&mut self.visibility));
    }

    /// Advance the clock by a wall delta, then propagate every body at the
    /// new simulated time
    pub fn tick(&mut self, wall_delta_seconds: f64) -> FrameSnapshot {
        self.clock.tick(wall_delta_seconds);
        self.refresh_ground_tracks();
        self.frame += 1;
        self.snapshot()
    }

    /// A ground track covers `[reference_time, reference_time + period)`;
    /// outside that window it no longer passes under the body. Inertial
    /// tracks are time-invariant and never re-sampled.
    fn refresh_ground_tracks(&mut self) {
        if self.engine.config().path_frame != PathFrame::EarthFixed {
            return;
        }

        let now = self.clock.simulated_time();
        let mut resampled = 0;
        for track in self.tracks.values_mut() {
            let Some(body) = self.engine.body(&track.body_id) else {
                continue;
            };
            let elapsed = seconds_between(track.reference_time, now);
            if (0.0..body.elements.period()).contains(&elapsed) {
                continue;
            }
            if let Some(fresh) = self.engine.orbit_track(&track.body_id, now) {
                *track = fresh;
                resampled += 1;
            }
        }

        if resampled > 0 {
            log::debug!("Re-sampled {} ground tracks at {}", resampled, now);
        }
    }

    /// Positions at the current simulated time without advancing the clock
    pub fn snapshot(&self) -> FrameSnapshot {
        let time = self.clock.simulated_time();
        let bodies = self
            .engine
            .propagate_all(time)
            .into_iter()
            .map(|state| {
                let visible = self.visibility.is_visible(&state.id);
                BodyFrame { state, visible }
            })
            .collect();

        FrameSnapshot {
            frame: self.frame,
            simulated_time: time,
            playback_rate: self.clock.playback_rate(),
            earth_rotation: greenwich_mean_sidereal_time(time),
            bodies,
        }
    }
}
