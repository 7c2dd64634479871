// Alternative slot search, re-verified against the occupant set

use crate::domain::{
    ConflictType, EventProposal, Location, Occupant, Suggestions, TimeWindow, VenueDirectory,
};

use super::classify::{classify, conflicts_with_any};

/// Hour offsets tried for alternative times, nearest first
const HOUR_OFFSETS: [i64; 6] = [1, -1, 2, -2, 3, -3];

pub(crate) struct SuggestionLimits {
    pub alternative_days: i64,
    pub max_suggestions: usize,
}

pub(crate) fn suggest(
    proposal: &EventProposal,
    occupants: &[Occupant],
    venues: &VenueDirectory,
    limits: &SuggestionLimits,
) -> Suggestions {
    Suggestions {
        alternative_times: free_windows(
            proposal,
            occupants,
            HOUR_OFFSETS.iter().filter_map(|h| proposal.window.shift_minutes(h * 60)),
            limits.max_suggestions,
        ),
        alternative_dates: free_windows(
            proposal,
            occupants,
            (1..=limits.alternative_days).filter_map(|d| proposal.window.shift_days(d)),
            limits.max_suggestions,
        ),
        alternative_locations: free_locations(proposal, occupants, venues, limits.max_suggestions),
        nearby_venues: nearby_venues(proposal, occupants, venues, limits.max_suggestions),
    }
}

fn free_windows(
    proposal: &EventProposal,
    occupants: &[Occupant],
    candidates: impl Iterator<Item = TimeWindow>,
    limit: usize,
) -> Vec<TimeWindow> {
    candidates
        .filter(|window| {
            let moved = EventProposal {
                window: *window,
                ..proposal.clone()
            };
            !conflicts_with_any(&moved, occupants)
        })
        .take(limit)
        .collect()
}

fn relocated(proposal: &EventProposal, location: Location) -> EventProposal {
    EventProposal {
        location,
        ..proposal.clone()
    }
}

/// Venues where the proposal would clash with nothing at all
fn free_locations(
    proposal: &EventProposal,
    occupants: &[Occupant],
    venues: &VenueDirectory,
    limit: usize,
) -> Vec<Location> {
    venues
        .alternatives_to(&proposal.location)
        .into_iter()
        .map(|venue| venue.to_location())
        .filter(|location| !conflicts_with_any(&relocated(proposal, location.clone()), occupants))
        .take(limit)
        .collect()
}

/// Venues that are themselves free at the window, even if the city is busy
fn nearby_venues(
    proposal: &EventProposal,
    occupants: &[Occupant],
    venues: &VenueDirectory,
    limit: usize,
) -> Vec<Location> {
    venues
        .alternatives_to(&proposal.location)
        .into_iter()
        .map(|venue| venue.to_location())
        .filter(|location| {
            let moved = relocated(proposal, location.clone());
            !occupants.iter().any(|occupant| {
                matches!(
                    classify(&moved, occupant),
                    Some((ConflictType::SameVenueTime | ConflictType::SameVenueTimeHold, _))
                )
            })
        })
        .take(limit)
        .collect()
}
