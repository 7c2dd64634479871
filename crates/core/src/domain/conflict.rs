// Conflict Report Model (transient, never persisted)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{EventRecord, Location};
use super::hold::PencilHold;
use super::window::TimeWindow;

/// Something occupying a (category, location, window) slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum Occupant {
    /// Hard block
    Committed(EventRecord),
    /// Soft block, may be preempted once it expires
    Held(PencilHold),
}

impl Occupant {
    pub fn id(&self) -> &str {
        match self {
            Occupant::Committed(e) => &e.id,
            Occupant::Held(h) => &h.id,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Occupant::Committed(e) => &e.category,
            Occupant::Held(h) => &h.category,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Occupant::Committed(e) => &e.location,
            Occupant::Held(h) => &h.location,
        }
    }

    pub fn window(&self) -> &TimeWindow {
        match self {
            Occupant::Committed(e) => &e.window,
            Occupant::Held(h) => &h.window,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Occupant::Held(_))
    }
}

/// Conflict classification, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    SameVenueTime,
    SameVenueTimeHold,
    SameCategoryTime,
    SameCategoryTimeHold,
    SameCityTime,
    SameCityTimeHold,
}

impl ConflictType {
    /// 0 = highest priority
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    /// Hold variant of a committed-event type
    pub fn as_hold(self) -> Self {
        match self {
            ConflictType::SameVenueTime => ConflictType::SameVenueTimeHold,
            ConflictType::SameCategoryTime => ConflictType::SameCategoryTimeHold,
            ConflictType::SameCityTime => ConflictType::SameCityTimeHold,
            held => held,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(
            self,
            ConflictType::SameVenueTimeHold
                | ConflictType::SameCategoryTimeHold
                | ConflictType::SameCityTimeHold
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::SameVenueTime => "same-venue-time",
            ConflictType::SameVenueTimeHold => "same-venue-time-hold",
            ConflictType::SameCategoryTime => "same-category-time",
            ConflictType::SameCategoryTimeHold => "same-category-time-hold",
            ConflictType::SameCityTime => "same-city-time",
            ConflictType::SameCityTimeHold => "same-city-time-hold",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One match found by the overlap scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub against: Occupant,
    pub conflict_type: ConflictType,
    pub message: String,
}

/// Alternative slots that were free when the report was built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub alternative_times: Vec<TimeWindow>,
    pub alternative_dates: Vec<TimeWindow>,
    pub alternative_locations: Vec<Location>,
    pub nearby_venues: Vec<Location>,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.alternative_times.is_empty()
            && self.alternative_dates.is_empty()
            && self.alternative_locations.is_empty()
            && self.nearby_venues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicts: Vec<Conflict>,
    pub conflict_type: Option<ConflictType>,
    pub message: String,
    pub suggestions: Suggestions,
    /// Set when a source could not be consulted; the answer may miss conflicts
    pub degraded: bool,
}

impl ConflictReport {
    pub const NO_CONFLICT_MESSAGE: &'static str = "No scheduling conflicts found";

    pub fn clear() -> Self {
        Self {
            has_conflict: false,
            conflicts: Vec::new(),
            conflict_type: None,
            message: Self::NO_CONFLICT_MESSAGE.to_string(),
            suggestions: Suggestions::default(),
            degraded: false,
        }
    }

    /// Check could not run; never blocks the caller's write
    pub fn degraded(reason: impl fmt::Display) -> Self {
        Self {
            message: format!(
                "Conflict check unavailable ({}); proceeding without conflict warnings",
                reason
            ),
            degraded: true,
            ..Self::clear()
        }
    }

    /// Primary conflict, if any
    pub fn primary(&self) -> Option<&Conflict> {
        self.conflicts.first()
    }
}
