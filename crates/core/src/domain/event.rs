// Event Domain Model

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::window::TimeWindow;
use crate::error::{AppError, Result};

/// Event ID
pub type EventId = String;

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "cancelled" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WGS84 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// Where an event takes place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub venue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Location {
    pub fn new(city: impl Into<String>, venue_name: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            venue_name: venue_name.into(),
            coordinates: None,
        }
    }

    pub fn same_city(&self, other: &Location) -> bool {
        normalize(&self.city) == normalize(&other.city)
    }

    pub fn same_venue(&self, other: &Location) -> bool {
        normalize(&self.venue_name) == normalize(&other.venue_name)
    }
}

/// Trim, lowercase and collapse internal whitespace
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Committed (or draft) event, owned by the EventRepository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub category: String,
    pub location: Location,
    pub window: TimeWindow,
    pub status: EventStatus,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
}

impl EventRecord {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        location: Location,
        window: TimeWindow,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            location,
            window,
            status: EventStatus::Published,
            registration_deadline: None,
            capacity: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Drafts block slots but are never announced
    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }

    /// Start instant (event times are stored as UTC wall-clock)
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.window.starts_at().and_utc()
    }

    pub fn starts_at_naive(&self) -> NaiveDateTime {
        self.window.starts_at()
    }
}

/// Candidate input for a conflict check (EventRecord-shaped, without identity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProposal {
    pub category: String,
    pub location: Location,
    pub window: TimeWindow,
}

impl EventProposal {
    pub fn new(category: impl Into<String>, location: Location, window: TimeWindow) -> Self {
        Self {
            category: category.into(),
            location,
            window,
        }
    }

    /// Reject malformed input before it reaches the matching algorithm
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(AppError::Validation("category cannot be empty".to_string()));
        }
        if self.location.city.trim().is_empty() {
            return Err(AppError::Validation("city cannot be empty".to_string()));
        }
        if self.location.venue_name.trim().is_empty() {
            return Err(AppError::Validation(
                "venue name cannot be empty".to_string(),
            ));
        }
        self.window
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

impl From<&EventRecord> for EventProposal {
    fn from(event: &EventRecord) -> Self {
        Self {
            category: event.category.clone(),
            location: event.location.clone(),
            window: event.window,
        }
    }
}
