//! Show/hide decisions from the active-status feed and enabled categories

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Deserializer};

pub const ACTIVE: &str = "active";
pub const INACTIVE: &str = "inactive";

/// One entry of the status feed: `{ "id": ..., "isActive": 0|1 }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "isActive", deserialize_with = "flag_from_int_or_bool")]
    pub is_active: bool,
}

impl StatusRecord {
    pub fn new(id: impl Into<String>, is_active: bool) -> Self {
        Self {
            id: id.into(),
            is_active,
        }
    }
}

/// Parse feed entries one by one, skipping (and logging) any that are not a
/// valid status record so one bad entry does not discard the whole feed
pub fn status_records_from_values(values: Vec<serde_json::Value>) -> Vec<StatusRecord> {
    let total = values.len();
    let records: Vec<StatusRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping status record {}: {}", index, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        log::warn!("Skipped {} of {} status records", total - records.len(), total);
    }
    records
}

/// `visible = (active enabled AND is_active[id]) OR (inactive enabled AND !is_active[id])`.
///
/// An id missing from `active_map` matches neither branch and is hidden.
pub fn is_visible(id: &str, active_map: &HashMap<String, bool>, enabled: &BTreeSet<String>) -> bool {
    match active_map.get(id) {
        Some(true) => enabled.contains(ACTIVE),
        Some(false) => enabled.contains(INACTIVE),
        None => false,
    }
}

/// Where the status feed stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedState {
    /// No feed has arrived yet
    #[default]
    Pending,
    /// Feed loaded; maps body id to its active flag
    Loaded(HashMap<String, bool>),
    /// Feed fetch failed
    Unavailable,
}

/// Event-sourced visibility state.
///
/// Every transition consumes the current state and returns the next one.
/// Until a feed has loaded, filtering is a no-op and every body is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityFilter {
    enabled: BTreeSet<String>,
    feed: FeedState,
}

impl Default for VisibilityFilter {
    /// Both categories checked, no feed yet
    fn default() -> Self {
        Self {
            enabled: [ACTIVE, INACTIVE].iter().map(|s| s.to_string()).collect(),
            feed: FeedState::Pending,
        }
    }
}

impl VisibilityFilter {
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: categories.into_iter().map(Into::into).collect(),
            feed: FeedState::Pending,
        }
    }

    pub fn enabled_categories(&self) -> &BTreeSet<String> {
        &self.enabled
    }

    pub fn feed(&self) -> &FeedState {
        &self.feed
    }

    /// Add or remove a category label
    pub fn on_category_changed(mut self, label: &str, enabled: bool) -> Self {
        if enabled {
            self.enabled.insert(label.to_string());
        } else {
            self.enabled.remove(label);
        }
        log::debug!("Visibility categories now {:?}", self.enabled);
        self
    }

    /// Replace the active map with a freshly arrived feed. Later records for
    /// the same id win.
    pub fn on_status_feed_loaded(mut self, records: impl IntoIterator<Item = StatusRecord>) -> Self {
        let map: HashMap<String, bool> = records
            .into_iter()
            .map(|record| (record.id, record.is_active))
            .collect();
        log::info!("Status feed loaded with {} entries", map.len());
        self.feed = FeedState::Loaded(map);
        self
    }

    /// Record a failed fetch; filtering degrades to showing everything
    pub fn on_status_feed_failed(mut self) -> Self {
        log::warn!("Status feed unavailable, visibility filtering disabled");
        self.feed = FeedState::Unavailable;
        self
    }

    /// Visibility of one body under the current state
    pub fn is_visible(&self, id: &str) -> bool {
        match &self.feed {
            FeedState::Loaded(map) => is_visible(id, map, &self.enabled),
            FeedState::Pending | FeedState::Unavailable => true,
        }
    }

    /// Re-evaluate every id, keeping the visible ones in input order
    pub fn visible_ids<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        ids.into_iter().filter(|id| self.is_visible(id)).collect()
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s.trim().to_string(),
        RawId::Number(n) => n.to_string(),
    })
}

fn flag_from_int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
    }

    match RawFlag::deserialize(deserializer)? {
        RawFlag::Bool(b) => Ok(b),
        RawFlag::Int(0) => Ok(false),
        RawFlag::Int(1) => Ok(true),
        RawFlag::Int(other) => Err(serde::de::Error::custom(format!(
            "isActive must be 0 or 1, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn map(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries.iter().map(|(id, a)| (id.to_string(), *a)).collect()
    }

    #[test]
    fn test_predicate() {
        let active = map(&[("sat-1", true)]);
        assert!(is_visible("sat-1", &active, &categories(&[ACTIVE])));
        assert!(!is_visible("sat-1", &active, &categories(&[INACTIVE])));
        assert!(!is_visible("sat-2", &HashMap::new(), &categories(&[ACTIVE, INACTIVE])));

        let inactive = map(&[("sat-3", false)]);
        assert!(is_visible("sat-3", &inactive, &categories(&[INACTIVE])));
        assert!(!is_visible("sat-3", &inactive, &categories(&[])));
    }

    #[test]
    fn test_no_feed_shows_everything() {
        let filter = VisibilityFilter::default();
        assert!(filter.is_visible("anything"));

        let filter = filter.on_status_feed_failed();
        assert_eq!(filter.feed(), &FeedState::Unavailable);
        assert!(filter.is_visible("anything"));
    }

    #[test]
    fn test_events_recompute_visibility() {
        let filter = VisibilityFilter::default().on_status_feed_loaded(vec![
            StatusRecord::new("1", true),
            StatusRecord::new("2", false),
        ]);

        let ids = ["1", "2", "3"];
        assert_eq!(filter.visible_ids(ids), vec!["1", "2"]);

        let filter = filter.on_category_changed(INACTIVE, false);
        assert_eq!(filter.visible_ids(ids), vec!["1"]);

        let filter = filter
            .on_category_changed(ACTIVE, false)
            .on_category_changed(INACTIVE, true);
        assert_eq!(filter.visible_ids(ids), vec!["2"]);

        // A new feed replaces the old map entirely
        let filter = filter.on_status_feed_loaded(vec![StatusRecord::new("3", false)]);
        assert_eq!(filter.visible_ids(ids), vec!["3"]);
    }

    #[test]
    fn test_status_record_parsing() {
        let json = r#"[
            {"id": 25544, "isActive": 1},
            {"id": " 37846 ", "isActive": 0},
            {"id": "sat-9", "isActive": true}
        ]"#;
        let records: Vec<StatusRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(
            records,
            vec![
                StatusRecord::new("25544", true),
                StatusRecord::new("37846", false),
                StatusRecord::new("sat-9", true),
            ]
        );

        let bad = r#"[{"id": 1, "isActive": 2}]"#;
        assert!(serde_json::from_str::<Vec<StatusRecord>>(bad).is_err());
    }

    #[test]
    fn test_bad_status_entries_are_skipped() {
        let values: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"id": 1, "isActive": 1},
                {"id": 2, "isActive": 2},
                {"isActive": 0},
                {"id": 3, "isActive": 0}
            ]"#,
        )
        .unwrap();

        let records = status_records_from_values(values);
        assert_eq!(
            records,
            vec![StatusRecord::new("1", true), StatusRecord::new("3", false)]
        );
    }
}
