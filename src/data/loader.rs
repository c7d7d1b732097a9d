//! Loading element sets and status feeds from disk

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

use super::catalog::{bodies_from_records, split_tle_text, CatalogStats, OmmRecord};
use super::visibility::{status_records_from_values, StatusRecord, VisibilityFilter};
use crate::propagation::Body;

/// Source format of an element file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFormat {
    /// JSON array of OMM records
    OmmJson,
    /// Two- or three-line element text
    Tle,
}

impl ElementFormat {
    /// Guess from the file name, ignoring a trailing `.gz`
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".json") {
            Self::OmmJson
        } else {
            Self::Tle
        }
    }
}

/// Open a file, transparently decompressing `.gz`
fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gzipped {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Load OMM JSON records
pub fn load_omm_catalog(path: impl AsRef<Path>) -> Result<Vec<OmmRecord>> {
    let path = path.as_ref();
    log::info!("Loading element catalog from {:?}", path);

    let reader = open_reader(path)?;
    let records: Vec<OmmRecord> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse element catalog JSON {:?}", path))?;

    log::info!("Read {} catalog records", records.len());
    Ok(records)
}

/// Load bodies from an element file (OMM JSON or TLE text).
///
/// Malformed records are skipped; only I/O and top-level parse failures are
/// returned as errors.
pub fn load_bodies(path: impl AsRef<Path>) -> Result<(Vec<Body>, CatalogStats)> {
    let path = path.as_ref();
    match ElementFormat::from_path(path) {
        ElementFormat::OmmJson => {
            let records = load_omm_catalog(path)?;
            Ok(bodies_from_records(&records))
        }
        ElementFormat::Tle => {
            log::info!("Loading TLE file from {:?}", path);
            let mut text = String::new();
            open_reader(path)?
                .read_to_string(&mut text)
                .with_context(|| format!("Failed to read TLE file {:?}", path))?;
            let records = split_tle_text(&text);
            Ok(bodies_from_records(&records))
        }
    }
}

/// Load the active/inactive status feed
pub fn load_status_feed(path: impl AsRef<Path>) -> Result<Vec<StatusRecord>> {
    let path = path.as_ref();
    log::info!("Loading status feed from {:?}", path);

    let reader = open_reader(path)?;
    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse status feed {:?}", path))?;
    let records = status_records_from_values(values);

    log::info!("Read {} status records", records.len());
    Ok(records)
}

/// Element source that never takes the caller down: a failure yields an
/// empty body set
pub fn load_bodies_or_empty(path: impl AsRef<Path>) -> Vec<Body> {
    match load_bodies(path) {
        Ok((bodies, _)) => bodies,
        Err(e) => {
            log::warn!("Element source unavailable, continuing with no bodies: {:#}", e);
            Vec::new()
        }
    }
}

/// Apply a status feed load to the filter, degrading on failure
pub fn apply_status_feed(filter: VisibilityFilter, path: impl AsRef<Path>) -> VisibilityFilter {
    match load_status_feed(path) {
        Ok(records) => filter.on_status_feed_loaded(records),
        Err(e) => {
            log::warn!("Could not load status feed: {:#}", e);
            filter.on_status_feed_failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::visibility::FeedState;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const CATALOG: &str = r#"[
        {"OBJECT_NAME": "GOOD", "NORAD_CAT_ID": 1, "EPOCH": "2024-01-01T00:00:00",
         "MEAN_MOTION": 15.0, "ECCENTRICITY": 0.001, "INCLINATION": 51.6,
         "RA_OF_ASC_NODE": 10.0, "ARG_OF_PERICENTER": 20.0, "MEAN_ANOMALY": 30.0},
        {"OBJECT_NAME": "NO ECCENTRICITY", "NORAD_CAT_ID": 2, "EPOCH": "2024-01-01T00:00:00",
         "MEAN_MOTION": 15.0, "INCLINATION": 51.6,
         "RA_OF_ASC_NODE": 10.0, "ARG_OF_PERICENTER": 20.0, "MEAN_ANOMALY": 30.0}
    ]"#;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ElementFormat::from_path(Path::new("a/active.json")), ElementFormat::OmmJson);
        assert_eq!(ElementFormat::from_path(Path::new("a/active.JSON.gz")), ElementFormat::OmmJson);
        assert_eq!(ElementFormat::from_path(Path::new("galileo.tle")), ElementFormat::Tle);
        assert_eq!(ElementFormat::from_path(Path::new("galileo.txt.gz")), ElementFormat::Tle);
    }

    #[test]
    fn test_load_json_catalog_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "catalog.json", CATALOG.as_bytes());

        let (bodies, stats) = load_bodies(&path).unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].name, "GOOD");
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_load_gzipped_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CATALOG.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        let path = write_file(&dir, "catalog.json.gz", &compressed);

        let (bodies, _) = load_bodies(&path).unwrap();
        assert_eq!(bodies.len(), 1);
    }

    #[test]
    fn test_missing_files_degrade() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");

        assert!(load_bodies(&missing).is_err());
        assert!(load_bodies_or_empty(&missing).is_empty());

        let filter = apply_status_feed(VisibilityFilter::default(), &missing);
        assert_eq!(filter.feed(), &FeedState::Unavailable);
        assert!(filter.is_visible("1"));
    }

    #[test]
    fn test_load_status_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "status.json",
            br#"[{"id": 1, "isActive": 1}, {"id": 2, "isActive": 0}]"#,
        );

        let filter = apply_status_feed(VisibilityFilter::default(), &path);
        assert!(filter.is_visible("1"));
        assert!(filter.is_visible("2"));
        assert!(!filter.is_visible("3"));
    }

    #[test]
    fn test_one_bad_status_entry_keeps_the_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "status.json",
            br#"[{"id": 1, "isActive": 1}, {"id": 2, "isActive": 2}, {"id": 3, "isActive": 0}]"#,
        );

        assert_eq!(load_status_feed(&path).unwrap().len(), 2);

        let filter = apply_status_feed(VisibilityFilter::default(), &path);
        assert!(matches!(filter.feed(), FeedState::Loaded(_)));
        assert!(filter.is_visible("1"));
        assert!(!filter.is_visible("2"));
        assert!(filter.is_visible("3"));
    }

    #[test]
    fn test_garbage_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "status.json", b"{not json");
        assert!(load_status_feed(&path).is_err());
    }
}
