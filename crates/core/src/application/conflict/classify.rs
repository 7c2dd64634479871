// Overlap scan and conflict classification

use chrono::NaiveDate;

use crate::domain::{Conflict, ConflictReport, ConflictType, EventProposal, Occupant};

/// Classify one occupant against the proposal.
///
/// Returns the conflict type and the first day both windows overlap, or
/// `None` if the occupant does not conflict. Only occupants in the same city
/// can conflict; the venue check wins over the category check.
pub(crate) fn classify(proposal: &EventProposal, occupant: &Occupant) -> Option<(ConflictType, NaiveDate)> {
    let location = occupant.location();
    if !proposal.location.same_city(location) {
        return None;
    }
    let day = proposal.window.first_overlap_day(occupant.window())?;

    let committed = if proposal.location.same_venue(location) {
        ConflictType::SameVenueTime
    } else if crate::domain::event::normalize(&proposal.category)
        == crate::domain::event::normalize(occupant.category())
    {
        ConflictType::SameCategoryTime
    } else {
        ConflictType::SameCityTime
    };

    let conflict_type = if occupant.is_hold() {
        committed.as_hold()
    } else {
        committed
    };
    Some((conflict_type, day))
}

/// True if any occupant conflicts with the proposal
pub(crate) fn conflicts_with_any(proposal: &EventProposal, occupants: &[Occupant]) -> bool {
    occupants.iter().any(|o| classify(proposal, o).is_some())
}

/// Every conflict, ordered by priority then chronological proximity
pub(crate) fn find_conflicts(proposal: &EventProposal, occupants: &[Occupant]) -> Vec<Conflict> {
    let origin = proposal.window.starts_at();
    let mut found: Vec<(Conflict, i64)> = occupants
        .iter()
        .filter_map(|occupant| {
            let (conflict_type, day) = classify(proposal, occupant)?;
            let distance = (occupant.window().starts_at() - origin).num_seconds().abs();
            Some((
                Conflict {
                    message: describe(conflict_type, occupant, day),
                    against: occupant.clone(),
                    conflict_type,
                },
                distance,
            ))
        })
        .collect();

    found.sort_by(|(a, da), (b, db)| {
        a.conflict_type
            .priority()
            .cmp(&b.conflict_type.priority())
            .then(da.cmp(db))
            .then_with(|| a.against.id().cmp(b.against.id()))
    });
    found.into_iter().map(|(c, _)| c).collect()
}

/// Report for the scan result (suggestions are filled in by the caller)
pub(crate) fn build_report(conflicts: Vec<Conflict>) -> ConflictReport {
    let Some(primary) = conflicts.first() else {
        return ConflictReport::clear();
    };
    let message = match conflicts.len() {
        1 => primary.message.clone(),
        n => format!("{} (+{} more)", primary.message, n - 1),
    };
    ConflictReport {
        has_conflict: true,
        conflict_type: Some(primary.conflict_type),
        message,
        conflicts,
        ..ConflictReport::clear()
    }
}

/// One-line human summary of a single conflict
fn describe(conflict_type: ConflictType, occupant: &Occupant, day: NaiveDate) -> String {
    let location = occupant.location();
    let times = occupant.window().time_label();
    let base = match conflict_type {
        ConflictType::SameVenueTime => {
            format!("Venue {} is booked {} on {}", location.venue_name, times, day)
        }
        ConflictType::SameVenueTimeHold => {
            format!("Venue {} is pencilled in {} on {}", location.venue_name, times, day)
        }
        ConflictType::SameCategoryTime => format!(
            "Another {} event in {} runs {} on {}",
            occupant.category(),
            location.city,
            times,
            day
        ),
        ConflictType::SameCategoryTimeHold => format!(
            "Another {} event in {} is pencilled in {} on {}",
            occupant.category(),
            location.city,
            times,
            day
        ),
        ConflictType::SameCityTime => format!(
            "{} already hosts an event at {} {} on {}",
            location.city, location.venue_name, times, day
        ),
        ConflictType::SameCityTimeHold => format!(
            "{} has an event pencilled in at {} {} on {}",
            location.city, location.venue_name, times, day
        ),
    };
    match occupant {
        Occupant::Held(hold) => format!(
            "{} until {}",
            base,
            hold.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        Occupant::Committed(_) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventRecord, Location, PencilHold, SlotDescriptor, TimeWindow};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

    fn window(start: u32, end: u32) -> TimeWindow {
        TimeWindow::single_day(
            NaiveDate::from_ymd_opt(2024, 4, 14).unwrap(),
            NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn proposal() -> EventProposal {
        EventProposal::new("music", Location::new("Auckland", "Spark Arena"), window(10, 14))
    }

    fn event(id: &str, category: &str, venue: &str, city: &str, w: TimeWindow) -> Occupant {
        Occupant::Committed(EventRecord::new(id, category, Location::new(city, venue), w))
    }

    fn hold(id: &str, category: &str, venue: &str, w: TimeWindow) -> Occupant {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        Occupant::Held(
            PencilHold::new(
                id,
                SlotDescriptor::new(category, Location::new("Auckland", venue), w),
                "owner",
                now,
                now + Duration::days(30),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_classification_by_priority() {
        let p = proposal();
        assert_eq!(
            classify(&p, &event("a", "sports", "Spark Arena", "Auckland", window(12, 16))).map(|c| c.0),
            Some(ConflictType::SameVenueTime)
        );
        assert_eq!(
            classify(&p, &event("b", "music", "Town Hall", "Auckland", window(12, 16))).map(|c| c.0),
            Some(ConflictType::SameCategoryTime)
        );
        assert_eq!(
            classify(&p, &event("c", "sports", "Eden Park", "Auckland", window(12, 16))).map(|c| c.0),
            Some(ConflictType::SameCityTime)
        );
        assert_eq!(
            classify(&p, &event("d", "music", "Sky Stadium", "Wellington", window(12, 16))),
            None
        );
    }

    #[test]
    fn test_hold_variants() {
        let p = proposal();
        assert_eq!(
            classify(&p, &hold("h", "music", "Spark Arena", window(9, 11))).map(|c| c.0),
            Some(ConflictType::SameVenueTimeHold)
        );
        assert_eq!(
            classify(&p, &hold("h", "music", "Town Hall", window(9, 11))).map(|c| c.0),
            Some(ConflictType::SameCategoryTimeHold)
        );
    }

    #[test]
    fn test_touching_boundary_is_not_a_conflict() {
        let p = proposal();
        assert!(classify(&p, &event("a", "music", "Spark Arena", "Auckland", window(14, 16))).is_none());
        assert!(classify(&p, &event("b", "music", "Spark Arena", "Auckland", window(8, 10))).is_none());
    }

    #[test]
    fn test_ordering_priority_then_proximity() {
        let p = proposal();
        let occupants = vec![
            event("city", "sports", "Eden Park", "Auckland", window(10, 12)),
            hold("venue-hold", "music", "Spark Arena", window(11, 12)),
            event("cat-far", "music", "Town Hall", "Auckland", window(13, 15)),
            event("cat-near", "music", "Civic", "Auckland", window(10, 11)),
            event("venue", "sports", "Spark Arena", "Auckland", window(13, 18)),
        ];
        let ids: Vec<String> = find_conflicts(&p, &occupants)
            .iter()
            .map(|c| c.against.id().to_string())
            .collect();
        assert_eq!(ids, vec!["venue", "venue-hold", "cat-near", "cat-far", "city"]);
    }

    #[test]
    fn test_report_message_names_primary_conflict() {
        let p = proposal();
        let occupants = vec![
            event("venue", "sports", "Spark Arena", "Auckland", window(10, 14)),
            event("city", "sports", "Eden Park", "Auckland", window(10, 14)),
        ];
        let report = build_report(find_conflicts(&p, &occupants));
        assert!(report.has_conflict);
        assert_eq!(report.conflict_type, Some(ConflictType::SameVenueTime));
        assert_eq!(
            report.message,
            "Venue Spark Arena is booked 10:00–14:00 on 2024-04-14 (+1 more)"
        );
    }

    #[test]
    fn test_hold_message_mentions_expiry() {
        let p = proposal();
        let conflicts = find_conflicts(&p, &[hold("h", "music", "Spark Arena", window(10, 14))]);
        assert!(conflicts[0].message.contains("pencilled in"));
        assert!(conflicts[0].message.ends_with("until 2024-05-01 00:00 UTC"));
    }

    #[test]
    fn test_empty_scan_gives_clear_report() {
        let report = build_report(Vec::new());
        assert!(!report.has_conflict);
        assert_eq!(report.conflict_type, None);
        assert_eq!(report.message, ConflictReport::NO_CONFLICT_MESSAGE);
    }
}
