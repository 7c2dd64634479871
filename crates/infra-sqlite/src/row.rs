// Column codecs shared by the events and holds tables

use crate::error::corrupt_row;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gather_core::domain::event::normalize;
use gather_core::domain::{Coordinates, Location, TimeWindow};
use gather_core::error::Result;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";

/// Category, location and window columns (same layout in `events` and `holds`)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlacementColumns {
    pub category: String,
    pub city: String,
    pub venue_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
}

pub(crate) const PLACEMENT_COLUMNS: &str = "category, city, venue_name, latitude, longitude, \
     start_date, end_date, start_time, end_time";

impl PlacementColumns {
    pub(crate) fn location(&self) -> Location {
        let mut location = Location::new(self.city.clone(), self.venue_name.clone());
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            location.coordinates = Some(Coordinates {
                latitude,
                longitude,
            });
        }
        location
    }

    pub(crate) fn window(&self, table: &str, id: &str) -> Result<TimeWindow> {
        let date = |s: &str| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| corrupt_row(table, id, e))
        };
        let time = |s: &str| {
            NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| corrupt_row(table, id, e))
        };
        TimeWindow::new(
            date(&self.start_date)?,
            date(&self.end_date)?,
            time(&self.start_time)?,
            time(&self.end_time)?,
        )
        .map_err(|e| corrupt_row(table, id, e))
    }
}

/// Bind values for the placement columns, normalized keys included
pub(crate) struct Placement {
    pub category: String,
    pub category_key: String,
    pub city: String,
    pub city_key: String,
    pub venue_name: String,
    pub venue_key: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
}

impl Placement {
    pub(crate) fn new(category: &str, location: &Location, window: &TimeWindow) -> Self {
        Self {
            category: category.to_string(),
            category_key: normalize(category),
            city: location.city.clone(),
            city_key: normalize(&location.city),
            venue_name: location.venue_name.clone(),
            venue_key: normalize(&location.venue_name),
            latitude: location.coordinates.map(|c| c.latitude),
            longitude: location.coordinates.map(|c| c.longitude),
            start_date: window.start_date.format(DATE_FORMAT).to_string(),
            end_date: window.end_date.format(DATE_FORMAT).to_string(),
            start_time: window.start_time.format(TIME_FORMAT).to_string(),
            end_time: window.end_time.format(TIME_FORMAT).to_string(),
        }
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(table: &str, id: &str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| corrupt_row(table, id, format!("timestamp out of range: {}", ms)))
}
