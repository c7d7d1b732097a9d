//! Orbitclock - command line host
//!
//! Loads an element catalog and an optional status feed, then prints
//! positions, samples orbit paths, exports an ephemeris or runs the frame
//! loop against the simulation clock.

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use orbitclock::data::{apply_status_feed, load_bodies_or_empty, parse_epoch, ACTIVE, INACTIVE};
use orbitclock::ephemeris::{run_ephemeris_export, EphemerisArgs};
use orbitclock::propagation::frames::geocentric_lat_lon;
use orbitclock::propagation::{
    greenwich_mean_sidereal_time, NodeRotation, PathFrame, PropagationConfig, DEFAULT_PATH_POINTS,
};
use orbitclock::render::{orbit_polyline, satellite_instances, sun_direction_earth_fixed};
use orbitclock::sim::{
    format_rate, format_time, ControlEvent, FixedTimestep, FrameSnapshot, SimulationClock,
    SimulationState, WallClockPacer,
};

#[derive(Parser, Debug)]
#[command(name = "orbitclock", version, about = "Two-body satellite propagation on a controllable clock")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Element catalog (OMM JSON or TLE text, optionally .gz)
    #[arg(long, global = true, default_value = "data/active.json")]
    elements: PathBuf,
    /// Active/inactive status feed JSON
    #[arg(long, global = true)]
    status: Option<PathBuf>,
    /// Start time (RFC 3339 or catalog epoch format); defaults to now
    #[arg(long, global = true)]
    time: Option<String>,
    /// Whether RAAN is folded into the perifocal transform
    #[arg(long, global = true, value_enum, default_value_t = NodeArg::Apply)]
    node_rotation: NodeArg,
    /// Frame for sampled orbit paths
    #[arg(long, global = true, value_enum, default_value_t = FrameArg::Inertial)]
    path_frame: FrameArg,
    /// Points per sampled orbit path
    #[arg(long, global = true, default_value_t = DEFAULT_PATH_POINTS)]
    path_points: usize,
    /// Hide bodies the status feed marks active
    #[arg(long, global = true)]
    hide_active: bool,
    /// Hide bodies the status feed marks inactive
    #[arg(long, global = true)]
    hide_inactive: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every body's position at the start time
    Positions {
        /// Include bodies hidden by the visibility filter
        #[arg(long)]
        all: bool,
    },
    /// Print the sampled orbit path of one body
    Track {
        /// Body id (NORAD catalog number)
        #[arg(long)]
        id: String,
        /// Emit Y-up points in Earth radii instead of meters
        #[arg(long)]
        render_space: bool,
    },
    /// Export positions over a time window to JSON
    Ephemeris(EphemerisArgs),
    /// Run the frame loop and log snapshots
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,
    /// Playback rate (simulated seconds per wall second)
    #[arg(long, default_value_t = 1.0)]
    rate: f64,
    /// Target frames per second when pacing to the wall clock
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    /// Advance a fixed wall delta per frame without sleeping
    #[arg(long)]
    fixed_step: Option<f64>,
    /// Log a summary every N frames
    #[arg(long, default_value_t = 30)]
    log_every: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum NodeArg {
    Apply,
    Ignore,
}

impl From<NodeArg> for NodeRotation {
    fn from(arg: NodeArg) -> Self {
        match arg {
            NodeArg::Apply => NodeRotation::Apply,
            NodeArg::Ignore => NodeRotation::Ignore,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FrameArg {
    Inertial,
    EarthFixed,
}

impl From<FrameArg> for PathFrame {
    fn from(arg: FrameArg) -> Self {
        match arg {
            FrameArg::Inertial => PathFrame::Inertial,
            FrameArg::EarthFixed => PathFrame::EarthFixed,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let start = start_time(cli.common.time.as_deref())?;
    let state = build_state(&cli.common, start);

    match cli.command {
        Command::Positions { all } => print_positions(&state, all),
        Command::Track { id, render_space } => print_track(&state, &id, render_space)?,
        Command::Ephemeris(args) => {
            run_ephemeris_export(state.engine(), state.visibility(), start, &args)?
        }
        Command::Run(args) => run_frames(state, &args)?,
    }
    Ok(())
}

fn start_time(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(text) => parse_epoch(text).map_err(|e| anyhow!("invalid --time: {}", e)),
        None => Ok(Utc::now()),
    }
}

/// Load bodies and the status feed. Either source failing leaves the
/// simulation usable: no bodies, or no filtering.
fn build_state(common: &CommonArgs, start: DateTime<Utc>) -> SimulationState {
    let config = PropagationConfig {
        node_rotation: common.node_rotation.into(),
        path_frame: common.path_frame.into(),
        path_points: common.path_points,
    };
    log::info!(
        "Propagation: node rotation {}, {} paths of {} points",
        config.node_rotation.name(),
        config.path_frame.name(),
        config.path_points
    );

    let mut state = SimulationState::new(SimulationClock::new(start), config);
    state.apply(ControlEvent::BodiesLoaded(load_bodies_or_empty(&common.elements)));

    if let Some(path) = &common.status {
        state.update_visibility(|filter| apply_status_feed(filter, path));
    }
    if common.hide_active {
        state.apply(ControlEvent::CategoryChanged {
            label: ACTIVE.to_string(),
            enabled: false,
        });
    }
    if common.hide_inactive {
        state.apply(ControlEvent::CategoryChanged {
            label: INACTIVE.to_string(),
            enabled: false,
        });
    }

    log::info!(
        "Loaded {} bodies at {}",
        state.engine().body_count(),
        format_time(start)
    );
    state
}

fn print_positions(state: &SimulationState, all: bool) {
    let snapshot = state.snapshot();
    println!("# {}", format_time(snapshot.simulated_time));
    println!("# id name x_km y_km z_km lat_deg lon_deg alt_km visible");
    for body in snapshot.bodies.iter().filter(|b| all || b.visible) {
        let name = state
            .engine()
            .body(&body.state.id)
            .map(|b| b.name.as_str())
            .unwrap_or("");
        let p = body.state.position;
        let (lat, lon) = geocentric_lat_lon(&p);
        println!(
            "{} {:?} {:.3} {:.3} {:.3} {:.4} {:.4} {:.3} {}",
            body.state.id,
            name,
            p.x / 1000.0,
            p.y / 1000.0,
            p.z / 1000.0,
            lat.to_degrees(),
            lon.to_degrees(),
            body.state.altitude_m / 1000.0,
            body.visible
        );
    }
}

fn print_track(state: &SimulationState, id: &str, render_space: bool) -> Result<()> {
    let track = state
        .track(id)
        .ok_or_else(|| anyhow!("no body with id {}", id))?;

    println!(
        "# body {} {} frame, {} points from {}",
        track.body_id,
        track.frame.name(),
        track.points.len(),
        format_time(track.reference_time)
    );
    if render_space {
        let earth_rotation = greenwich_mean_sidereal_time(state.clock().simulated_time());
        for point in orbit_polyline(track, earth_rotation) {
            println!("{:.6} {:.6} {:.6}", point.x, point.y, point.z);
        }
    } else {
        for point in &track.points {
            println!("{:.3} {:.3} {:.3}", point.x, point.y, point.z);
        }
    }
    Ok(())
}

fn run_frames(mut state: SimulationState, args: &RunArgs) -> Result<()> {
    if !args.rate.is_finite() {
        return Err(anyhow!("rate must be a finite number"));
    }
    state.apply(ControlEvent::SetRate(args.rate));
    let log_every = args.log_every.max(1);

    let mut on_frame = |_: &mut SimulationState, snapshot: &FrameSnapshot| -> ControlFlow<()> {
        if snapshot.frame % log_every == 0 || snapshot.frame == args.frames {
            log_snapshot(snapshot);
        }
        ControlFlow::Continue(())
    };

    let frames = match args.fixed_step {
        Some(delta) => {
            let mut source = FixedTimestep::new(delta, Some(args.frames));
            orbitclock::sim::run(&mut state, &mut source, &mut on_frame)
        }
        None => {
            let mut source = WallClockPacer::new(args.fps, Some(args.frames));
            orbitclock::sim::run(&mut state, &mut source, &mut on_frame)
        }
    };

    log::info!(
        "Ran {} frames, simulated time {}",
        frames,
        state.clock().format_time()
    );
    Ok(())
}

fn log_snapshot(snapshot: &FrameSnapshot) {
    let instances = satellite_instances(snapshot, 1.0);
    let sun = sun_direction_earth_fixed(snapshot.simulated_time);
    log::info!(
        "Frame {}: {} at {}, {}/{} bodies visible, earth rotation {:.4} rad, sun ({:.3}, {:.3}, {:.3})",
        snapshot.frame,
        format_time(snapshot.simulated_time),
        format_rate(snapshot.playback_rate),
        instances.len(),
        snapshot.bodies.len(),
        snapshot.earth_rotation,
        sun.x,
        sun.y,
        sun.z
    );
    if let Some(first) = instances.first() {
        log::debug!(
            "First instance at {:?} color {:?}",
            first.position,
            first.color
        );
    }
}
