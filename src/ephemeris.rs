//! Batch ephemeris export: positions of every body over a time window

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::data::VisibilityFilter;
use crate::propagation::frames::{geocentric_lat_lon, inertial_to_earth_fixed};
use crate::propagation::{greenwich_mean_sidereal_time, PropagationEngine, EARTH_RADIUS_M};

/// Upper bound on samples per body in one export
pub const MAX_SAMPLES_PER_BODY: u64 = 1_000_000;

#[derive(Args, Debug, Clone)]
pub struct EphemerisArgs {
    /// Output JSON file path
    #[arg(long, default_value = "out/ephemeris.json")]
    pub output: PathBuf,
    /// Time span in hours
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,
    /// Sample step in seconds
    #[arg(long, default_value_t = 60)]
    pub step_seconds: u64,
    /// Only export bodies the visibility filter shows
    #[arg(long)]
    pub visible_only: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EphemerisSample {
    pub time_utc: String,
    /// Earth-fixed position in meters
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct BodyEphemeris {
    pub id: String,
    pub name: String,
    pub period_minutes: f64,
    pub perigee_km: f64,
    pub apogee_km: f64,
    pub samples: Vec<EphemerisSample>,
}

#[derive(Debug, Serialize)]
pub struct EphemerisDatabase {
    pub generated_at: String,
    pub start_time_utc: String,
    pub hours: f64,
    pub step_seconds: u64,
    pub node_rotation: String,
    pub total_bodies: usize,
    pub bodies: Vec<BodyEphemeris>,
}

/// Propagate every selected body from `start` over the requested window.
///
/// Samples are taken at `start + k * step` for `k = 0..=steps`, so the end of
/// the window is always included.
pub fn build_ephemeris(
    engine: &PropagationEngine,
    filter: &VisibilityFilter,
    start: DateTime<Utc>,
    args: &EphemerisArgs,
    progress: &ProgressBar,
) -> Result<EphemerisDatabase> {
    if args.step_seconds == 0 {
        return Err(anyhow!("step-seconds must be > 0"));
    }
    if !(args.hours.is_finite() && args.hours >= 0.0) {
        return Err(anyhow!("hours must be a non-negative number"));
    }

    let steps = sample_steps(args.hours, args.step_seconds)?;
    progress.set_length(steps + 1);

    let mut bodies: Vec<BodyEphemeris> = engine
        .bodies()
        .filter(|body| !args.visible_only || filter.is_visible(&body.id))
        .map(|body| {
            let (perigee_km, apogee_km) = body.elements.perigee_apogee_km();
            BodyEphemeris {
                id: body.id.clone(),
                name: body.name.clone(),
                period_minutes: body.elements.period() / 60.0,
                perigee_km,
                apogee_km,
                samples: Vec::new(),
            }
        })
        .collect();

    log::info!(
        "Exporting {} bodies over {} hours ({} samples each)...",
        bodies.len(),
        args.hours,
        steps + 1
    );

    let node = engine.config().node_rotation;
    for step in 0..=steps {
        let offset = step
            .checked_mul(args.step_seconds)
            .and_then(|s| i64::try_from(s).ok())
            .and_then(Duration::try_seconds)
            .ok_or_else(|| anyhow!("time window too large"))?;
        let time = start
            .checked_add_signed(offset)
            .ok_or_else(|| anyhow!("time window runs past the representable range"))?;
        let gmst = greenwich_mean_sidereal_time(time);
        let time_utc = time.to_rfc3339();

        for entry in bodies.iter_mut() {
            let Some(body) = engine.body(&entry.id) else {
                continue;
            };
            let inertial = engine.inertial_position_at(&body.elements, time);
            let fixed = inertial_to_earth_fixed(&inertial, gmst);
            let (lat, lon) = geocentric_lat_lon(&fixed);
            entry.samples.push(EphemerisSample {
                time_utc: time_utc.clone(),
                x_m: fixed.x,
                y_m: fixed.y,
                z_m: fixed.z,
                latitude_deg: lat.to_degrees(),
                longitude_deg: lon.to_degrees(),
                altitude_km: (fixed.norm() - EARTH_RADIUS_M) / 1000.0,
            });
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(EphemerisDatabase {
        generated_at: Utc::now().to_rfc3339(),
        start_time_utc: start.to_rfc3339(),
        hours: args.hours,
        step_seconds: args.step_seconds,
        node_rotation: node.name().to_string(),
        total_bodies: bodies.len(),
        bodies,
    })
}

/// Number of steps after the start sample, refusing windows that would
/// exceed [`MAX_SAMPLES_PER_BODY`]
fn sample_steps(hours: f64, step_seconds: u64) -> Result<u64> {
    let steps = ((hours * 3600.0) / step_seconds as f64).ceil();
    if !steps.is_finite() || steps >= MAX_SAMPLES_PER_BODY as f64 {
        return Err(anyhow!(
            "{} hours at {} s steps exceeds {} samples per body",
            hours,
            step_seconds,
            MAX_SAMPLES_PER_BODY
        ));
    }
    Ok(steps as u64)
}

/// Build the export with a terminal progress bar and write it as JSON
pub fn run_ephemeris_export(
    engine: &PropagationEngine,
    filter: &VisibilityFilter,
    start: DateTime<Utc>,
    args: &EphemerisArgs,
) -> Result<()> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
        )?
        .progress_chars("##-"),
    );

    let database = build_ephemeris(engine, filter, start, args, &progress)?;
    write_json(&args.output, &database)?;
    log::info!(
        "Wrote ephemeris for {} bodies to {:?}",
        database.total_bodies,
        args.output
    );
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
