//! Element catalog records and their normalization into bodies

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::propagation::{Body, ElementError, OrbitalElements};

/// Why a source record could not become a body
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Numeric fields missing or out of range
    Elements(ElementError),

    /// Two-line text rejected by the TLE parser
    Tle { message: String },

    /// Epoch string or instant could not be interpreted
    Epoch { value: String },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elements(e) => write!(f, "Malformed element set: {}", e),
            Self::Tle { message } => write!(f, "Invalid TLE: {}", message),
            Self::Epoch { value } => write!(f, "Unparseable epoch: {}", value),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Elements(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ElementError> for RecordError {
    fn from(e: ElementError) -> Self {
        Self::Elements(e)
    }
}

/// Anything that can be normalized into a [`Body`]
pub trait ElementRecord {
    /// Human-readable label for log messages
    fn label(&self) -> String;

    fn to_body(&self) -> Result<Body, RecordError>;
}

/// One object from a CelesTrak-style OMM JSON catalog.
///
/// Angles are degrees and mean motion is revolutions per day, as published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmmRecord {
    #[serde(rename = "OBJECT_NAME")]
    pub object_name: Option<String>,
    #[serde(rename = "OBJECT_ID")]
    pub object_id: Option<String>,
    #[serde(rename = "NORAD_CAT_ID")]
    pub norad_cat_id: Option<u32>,
    #[serde(rename = "EPOCH")]
    pub epoch: Option<String>,
    #[serde(rename = "MEAN_MOTION")]
    pub mean_motion: Option<f64>,
    #[serde(rename = "ECCENTRICITY")]
    pub eccentricity: Option<f64>,
    #[serde(rename = "INCLINATION")]
    pub inclination: Option<f64>,
    #[serde(rename = "RA_OF_ASC_NODE")]
    pub ra_of_asc_node: Option<f64>,
    #[serde(rename = "ARG_OF_PERICENTER")]
    pub arg_of_pericenter: Option<f64>,
    #[serde(rename = "MEAN_ANOMALY")]
    pub mean_anomaly: Option<f64>,
}

impl OmmRecord {
    /// Catalog number when present, otherwise the international designator
    pub fn id(&self) -> Option<String> {
        self.norad_cat_id
            .map(|n| n.to_string())
            .or_else(|| self.object_id.clone())
    }
}

impl ElementRecord for OmmRecord {
    fn label(&self) -> String {
        match (&self.object_name, self.id()) {
            (Some(name), Some(id)) => format!("{} ({})", name, id),
            (Some(name), None) => name.clone(),
            (None, Some(id)) => id,
            (None, None) => "<unnamed>".to_string(),
        }
    }

    fn to_body(&self) -> Result<Body, RecordError> {
        let id = self.id().ok_or(ElementError::MissingField {
            field: "NORAD_CAT_ID",
        })?;
        let epoch_str = self
            .epoch
            .as_deref()
            .ok_or(ElementError::MissingField { field: "EPOCH" })?;
        let epoch = parse_epoch(epoch_str)?;

        let elements = OrbitalElements::from_catalog_units(
            required(self.mean_motion, "MEAN_MOTION")?,
            required(self.eccentricity, "ECCENTRICITY")?,
            required(self.inclination, "INCLINATION")?,
            required(self.ra_of_asc_node, "RA_OF_ASC_NODE")?,
            required(self.arg_of_pericenter, "ARG_OF_PERICENTER")?,
            // Older catalogs omit it; phase is then measured from the epoch
            self.mean_anomaly.unwrap_or(0.0),
            epoch,
        )?;

        let name = self.object_name.clone().unwrap_or_else(|| id.clone());
        Ok(Body::new(id, name, elements))
    }
}

/// Two-line element set with an optional name line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TleData {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

impl ElementRecord for TleData {
    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.line1.clone())
    }

    fn to_body(&self) -> Result<Body, RecordError> {
        let tle = parse_tle(self)?;
        let epoch = instant_to_utc(&tle.epoch)?;

        let elements = OrbitalElements::from_catalog_units(
            tle.mean_motion,
            tle.eccen,
            tle.inclination,
            tle.raan,
            tle.arg_of_perigee,
            tle.mean_anomaly,
            epoch,
        )?;

        let id = tle.sat_num.to_string();
        let name = self
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("NORAD {}", id));
        Ok(Body::new(id, name, elements))
    }
}

/// Counts from turning a batch of records into bodies
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_records: usize,
    pub loaded: usize,
    pub skipped: usize,
}

/// Normalize every record, skipping (and logging) the malformed ones
pub fn bodies_from_records<R: ElementRecord>(records: &[R]) -> (Vec<Body>, CatalogStats) {
    let mut stats = CatalogStats {
        total_records: records.len(),
        ..CatalogStats::default()
    };
    let mut bodies = Vec::with_capacity(records.len());

    for record in records {
        match record.to_body() {
            Ok(body) => {
                bodies.push(body);
                stats.loaded += 1;
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", record.label(), e);
                stats.skipped += 1;
            }
        }
    }

    log::info!(
        "Normalized {} of {} element records ({} skipped)",
        stats.loaded,
        stats.total_records,
        stats.skipped
    );
    (bodies, stats)
}

/// Split TLE text into records. Handles both 2-line and 3-line (named) sets.
pub fn split_tle_text(data: &str) -> Vec<TleData> {
    let lines: Vec<&str> = data
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let mut records = Vec::new();

    let mut i = 0;
    while i + 1 < lines.len() {
        let first = lines[i];
        if first.starts_with("1 ") && lines[i + 1].starts_with("2 ") {
            records.push(TleData {
                name: None,
                line1: first.to_string(),
                line2: lines[i + 1].to_string(),
            });
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            let name = first.trim().trim_start_matches("0 ").to_string();
            records.push(TleData {
                name: Some(name),
                line1: lines[i + 1].to_string(),
                line2: lines[i + 2].to_string(),
            });
            i += 3;
        } else {
            log::trace!("Skipping stray TLE line: {}", first);
            i += 1;
        }
    }

    records
}

/// Parse TLE data into a satkit TLE
fn parse_tle(tle_data: &TleData) -> Result<satkit::TLE, RecordError> {
    satkit::TLE::load_2line(&tle_data.line1, &tle_data.line2).map_err(|e| RecordError::Tle {
        message: e.to_string(),
    })
}

/// Convert a satkit instant to UTC
pub fn instant_to_utc(instant: &satkit::Instant) -> Result<DateTime<Utc>, RecordError> {
    let (year, month, day, hour, minute, second) = instant.as_datetime();
    let invalid = || RecordError::Epoch {
        value: format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{}",
            year, month, day, hour, minute, second
        ),
    };

    if !second.is_finite() || second < 0.0 {
        return Err(invalid());
    }
    let whole = Utc
        .with_ymd_and_hms(
            year as i32,
            month as u32,
            day as u32,
            hour as u32,
            minute as u32,
            0,
        )
        .single()
        .ok_or_else(invalid)?;
    Ok(whole + Duration::microseconds((second * 1e6).round() as i64))
}

/// Accepts RFC 3339 and the zone-less `YYYY-MM-DDTHH:MM:SS[.ffffff]` form
/// used by OMM catalogs (interpreted as UTC).
pub fn parse_epoch(value: &str) -> Result<DateTime<Utc>, RecordError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(RecordError::Epoch {
        value: value.to_string(),
    })
}

fn required(value: Option<f64>, field: &'static str) -> Result<f64, ElementError> {
    match value {
        None => Err(ElementError::MissingField { field }),
        Some(v) if !v.is_finite() => Err(ElementError::NonFinite { field }),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const ISS_LINE1: &str =
        "1 25544U 98067A   12304.22916904  .00016548  00000-0  28330-3 0  5509";
    const ISS_LINE2: &str =
        "2 25544  51.6482 170.5822 0016684 224.8813 236.0409 15.51231918798998";

    fn omm(json: &str) -> OmmRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_omm_record_to_body() {
        let record = omm(
            r#"{
                "OBJECT_NAME": "GSAT0101 (GALILEO-PFM)",
                "OBJECT_ID": "2011-060A",
                "NORAD_CAT_ID": 37846,
                "EPOCH": "2024-09-03T17:44:09.922272",
                "MEAN_MOTION": 1.70476006,
                "ECCENTRICITY": 0.0001042,
                "INCLINATION": 57.1274,
                "RA_OF_ASC_NODE": 359.4123,
                "ARG_OF_PERICENTER": 74.3951,
                "MEAN_ANOMALY": 285.6259
            }"#,
        );

        let body = record.to_body().unwrap();
        assert_eq!(body.id, "37846");
        assert_eq!(body.name, "GSAT0101 (GALILEO-PFM)");
        assert!((body.elements.inclination() - 57.1274_f64.to_radians()).abs() < 1e-12);
        assert!((body.elements.semi_major_axis() / 1000.0 - 29_600.0).abs() < 5.0);
        assert_eq!(body.elements.epoch().hour(), 17);
    }

    #[test]
    fn test_omm_missing_field_is_rejected() {
        let record = omm(r#"{"NORAD_CAT_ID": 1, "EPOCH": "2024-01-01T00:00:00", "MEAN_MOTION": 15.0}"#);
        assert_eq!(
            record.to_body(),
            Err(RecordError::Elements(ElementError::MissingField {
                field: "ECCENTRICITY"
            }))
        );
    }

    #[test]
    fn test_bodies_from_records_skips_malformed() {
        let good = omm(
            r#"{"NORAD_CAT_ID": 1, "EPOCH": "2024-01-01T00:00:00", "MEAN_MOTION": 15.0,
                "ECCENTRICITY": 0.001, "INCLINATION": 51.6, "RA_OF_ASC_NODE": 10.0,
                "ARG_OF_PERICENTER": 20.0, "MEAN_ANOMALY": 30.0}"#,
        );
        let hyperbolic = omm(
            r#"{"NORAD_CAT_ID": 2, "EPOCH": "2024-01-01T00:00:00", "MEAN_MOTION": 15.0,
                "ECCENTRICITY": 1.5, "INCLINATION": 51.6, "RA_OF_ASC_NODE": 10.0,
                "ARG_OF_PERICENTER": 20.0, "MEAN_ANOMALY": 30.0}"#,
        );
        let bad_epoch = omm(
            r#"{"NORAD_CAT_ID": 3, "EPOCH": "yesterday", "MEAN_MOTION": 15.0,
                "ECCENTRICITY": 0.001, "INCLINATION": 51.6, "RA_OF_ASC_NODE": 10.0,
                "ARG_OF_PERICENTER": 20.0}"#,
        );

        let (bodies, stats) = bodies_from_records(&[good, hyperbolic, bad_epoch]);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].id, "1");
        assert_eq!(
            stats,
            CatalogStats {
                total_records: 3,
                loaded: 1,
                skipped: 2
            }
        );
    }

    #[test]
    fn test_parse_epoch_formats() {
        let a = parse_epoch("2024-09-03T17:44:09.5").unwrap();
        assert_eq!(a.nanosecond(), 500_000_000);
        let b = parse_epoch("2024-09-03T17:44:09Z").unwrap();
        assert_eq!(b.second(), 9);
        assert!(parse_epoch("2024-13-01T00:00:00").is_err());
    }

    #[test]
    fn test_split_tle_text() {
        let text = format!(
            "ISS (ZARYA)\n{}\n{}\n\n{}\n{}\ngarbage\n",
            ISS_LINE1, ISS_LINE2, ISS_LINE1, ISS_LINE2
        );
        let records = split_tle_text(&text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(records[1].name, None);
        assert_eq!(records[1].line2, ISS_LINE2);
    }

    #[test]
    fn test_tle_to_body() {
        let tle = TleData {
            name: Some("ISS (ZARYA)".to_string()),
            line1: ISS_LINE1.to_string(),
            line2: ISS_LINE2.to_string(),
        };
        let body = tle.to_body().unwrap();

        assert_eq!(body.id, "25544");
        assert_eq!(body.name, "ISS (ZARYA)");
        assert!((body.elements.eccentricity() - 0.0016684).abs() < 1e-9);
        assert!((body.elements.raan() - 170.5822_f64.to_radians()).abs() < 1e-9);

        // Day 304.22916904 of 2012 is 30 October, 05:30 UTC
        let epoch = body.elements.epoch();
        assert_eq!((epoch.year(), epoch.month(), epoch.day()), (2012, 10, 30));
        assert_eq!((epoch.hour(), epoch.minute()), (5, 30));
    }
}
