//! Dashboard selection: park, civil date and visible attractions.
//!
//! Pure state with explicit transitions, driven by whoever loads the data
//! (the dashboard handler per request). Every transition is idempotent for
//! the same inputs.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::db::models::Park;

/// Which attraction columns are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttractionFilter {
    All,
    /// An explicit set of names. An empty set shows every attraction.
    Only(BTreeSet<String>),
}

impl AttractionFilter {
    pub fn is_visible(&self, name: &str) -> bool {
        match self {
            AttractionFilter::All => true,
            AttractionFilter::Only(names) => names.is_empty() || names.contains(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    park_id: Option<String>,
    date: Option<NaiveDate>,
    filter: AttractionFilter,
    /// Set when the park changed and the new park's attraction list has not
    /// been seen yet.
    filter_reset_pending: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self {
            park_id: None,
            date: None,
            filter: AttractionFilter::All,
            filter_reset_pending: false,
        }
    }

    pub fn park_id(&self) -> Option<&str> {
        self.park_id.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Park list loaded: pick the first park if none is selected yet.
    pub fn on_parks_loaded(&mut self, parks: &[Park]) {
        if self.park_id.is_none() {
            if let Some(first) = parks.first() {
                self.select_park(&first.id);
            }
        }
    }

    /// Explicit park choice. Changing park schedules a filter reset.
    pub fn select_park(&mut self, park_id: &str) {
        if self.park_id.as_deref() != Some(park_id) {
            self.park_id = Some(park_id.to_string());
            self.filter_reset_pending = true;
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
    }

    /// Available dates for the current park loaded (most recent first).
    ///
    /// Keeps the selected date when the new list contains it, otherwise
    /// selects the first entry. An empty list leaves the selection alone.
    pub fn on_dates_loaded(&mut self, dates: &[NaiveDate]) {
        let Some(&first) = dates.first() else {
            return;
        };
        match self.date {
            Some(current) if dates.contains(&current) => {}
            _ => self.date = Some(first),
        }
    }

    /// The selected park's attraction list loaded.
    ///
    /// After a park change, visibility resets to every attraction. Reloads for
    /// the same park keep the user's filter.
    pub fn on_attractions_loaded(&mut self, names: &[String]) {
        if self.filter_reset_pending && !names.is_empty() {
            self.filter = AttractionFilter::All;
            self.filter_reset_pending = false;
        }
    }

    /// Show exactly these attractions.
    pub fn set_visible<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = AttractionFilter::Only(names.into_iter().map(Into::into).collect());
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.filter.is_visible(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn park(id: &str) -> Park {
        Park {
            id: id.to_string(),
            name: id.to_string(),
            thrill_api_id: id.to_string(),
            themeparks_entity_id: None,
            timezone: Some("America/New_York".to_string()),
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_park_selected_when_none() {
        let mut s = SelectionState::new();
        s.on_parks_loaded(&[]);
        assert_eq!(s.park_id(), None);
        s.on_parks_loaded(&[park("animal-kingdom"), park("epcot")]);
        assert_eq!(s.park_id(), Some("animal-kingdom"));
    }

    #[test]
    fn test_existing_park_kept_on_parks_loaded() {
        let mut s = SelectionState::new();
        s.select_park("epcot");
        s.on_parks_loaded(&[park("animal-kingdom"), park("epcot")]);
        assert_eq!(s.park_id(), Some("epcot"));
    }

    #[test]
    fn test_dates_keep_current_if_present() {
        let mut s = SelectionState::new();
        s.select_date(d("2026-01-10"));
        s.on_dates_loaded(&[d("2026-01-11"), d("2026-01-10")]);
        assert_eq!(s.date(), Some(d("2026-01-10")));
    }

    #[test]
    fn test_dates_fall_back_to_most_recent() {
        let mut s = SelectionState::new();
        s.select_date(d("2025-12-01"));
        s.on_dates_loaded(&[d("2026-01-11"), d("2026-01-10")]);
        assert_eq!(s.date(), Some(d("2026-01-11")));

        let mut fresh = SelectionState::new();
        fresh.on_dates_loaded(&[d("2026-01-11")]);
        assert_eq!(fresh.date(), Some(d("2026-01-11")));
    }

    #[test]
    fn test_empty_date_list_keeps_selection() {
        let mut s = SelectionState::new();
        s.select_date(d("2026-01-10"));
        s.on_dates_loaded(&[]);
        assert_eq!(s.date(), Some(d("2026-01-10")));
    }

    #[test]
    fn test_dates_loaded_is_idempotent() {
        let dates = [d("2026-01-11"), d("2026-01-10")];
        let mut s = SelectionState::new();
        s.on_dates_loaded(&dates);
        let once = s.clone();
        s.on_dates_loaded(&dates);
        assert_eq!(s, once);
    }

    #[test]
    fn test_park_change_resets_filter_on_attraction_load() {
        let mut s = SelectionState::new();
        s.select_park("epcot");
        s.on_attractions_loaded(&names(&["Soarin", "Frozen"]));
        s.set_visible(["Soarin"]);
        assert!(!s.is_visible("Frozen"));

        s.select_park("magic-kingdom");
        // Not reset until the new park's attractions arrive
        assert!(!s.is_visible("Frozen"));
        s.on_attractions_loaded(&names(&["Space Mountain"]));
        assert!(s.is_visible("Frozen"));
        assert!(s.is_visible("Space Mountain"));
    }

    #[test]
    fn test_reload_same_park_keeps_filter() {
        let mut s = SelectionState::new();
        s.select_park("epcot");
        s.on_attractions_loaded(&names(&["Soarin", "Frozen"]));
        s.set_visible(["Soarin"]);
        s.select_park("epcot");
        s.on_attractions_loaded(&names(&["Soarin", "Frozen"]));
        assert!(!s.is_visible("Frozen"));
    }

    #[test]
    fn test_visible_set_narrows_columns() {
        let mut s = SelectionState::new();
        assert!(s.is_visible("B"));
        s.set_visible(["A", "C"]);
        assert!(s.is_visible("A"));
        assert!(!s.is_visible("B"));
    }

    #[test]
    fn test_empty_selection_shows_everything() {
        let mut s = SelectionState::new();
        s.set_visible(Vec::<String>::new());
        assert!(s.is_visible("Anything"));
        assert!(AttractionFilter::Only(BTreeSet::new()).is_visible("Anything"));
    }
}
