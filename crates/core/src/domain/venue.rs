// Known venues per city (static/config directory used for location suggestions)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::event::{normalize, Coordinates, Location};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl Venue {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates {
            latitude,
            longitude,
        });
        self
    }

    pub fn to_location(&self) -> Location {
        Location {
            city: self.city.clone(),
            venue_name: self.name.clone(),
            coordinates: self.coordinates,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueDirectory {
    venues: Vec<Venue>,
}

impl VenueDirectory {
    pub fn new(venues: Vec<Venue>) -> Self {
        Self { venues }
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    pub fn in_city(&self, city: &str) -> Vec<&Venue> {
        let city = normalize(city);
        self.venues
            .iter()
            .filter(|v| normalize(&v.city) == city)
            .collect()
    }

    /// Venues in `origin`'s city other than `origin` itself, nearest first.
    ///
    /// Venues without coordinates sort after those with, alphabetically.
    pub fn alternatives_to(&self, origin: &Location) -> Vec<&Venue> {
        let own = normalize(&origin.venue_name);
        let mut venues: Vec<&Venue> = self
            .in_city(&origin.city)
            .into_iter()
            .filter(|v| normalize(&v.name) != own)
            .collect();

        let distance = |v: &Venue| match (origin.coordinates, v.coordinates) {
            (Some(a), Some(b)) => Some(a.distance_km(&b)),
            _ => None,
        };
        venues.sort_by(|a, b| match (distance(a), distance(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        venues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> VenueDirectory {
        VenueDirectory::new(vec![
            Venue::new("Eden Park", "Auckland").with_coordinates(-36.8750, 174.7446),
            Venue::new("Spark Arena", "Auckland").with_coordinates(-36.8475, 174.7786),
            Venue::new("Town Hall", "Auckland"),
            Venue::new("Mt Smart Stadium", "Auckland").with_coordinates(-36.9182, 174.8128),
            Venue::new("Sky Stadium", "Wellington"),
        ])
    }

    #[test]
    fn test_in_city_is_case_insensitive() {
        assert_eq!(directory().in_city("auckland").len(), 4);
        assert_eq!(directory().in_city("Christchurch").len(), 0);
    }

    #[test]
    fn test_alternatives_nearest_first_and_exclude_origin() {
        let dir = directory();
        let mut origin = Location::new("Auckland", "Eden Park");
        origin.coordinates = Some(Coordinates {
            latitude: -36.8750,
            longitude: 174.7446,
        });

        let names: Vec<&str> = dir
            .alternatives_to(&origin)
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["Spark Arena", "Mt Smart Stadium", "Town Hall"]);
    }

    #[test]
    fn test_alternatives_without_coordinates_are_alphabetical() {
        let dir = directory();
        let names: Vec<String> = dir
            .alternatives_to(&Location::new("Auckland", "Town Hall"))
            .iter()
            .map(|v| v.name.clone())
            .collect();
        assert_eq!(names, vec!["Eden Park", "Mt Smart Stadium", "Spark Arena"]);
    }
}
