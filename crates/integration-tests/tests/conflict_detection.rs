//! Conflict detection against the SQLite store
//!
//! The engine reads committed events and active holds through the adapters;
//! these tests cover classification, ordering, suggestions and degraded mode.

mod common;

use chrono::{Duration, NaiveDate, NaiveTime};
use common::*;
use gather_core::domain::{ConflictReport, ConflictType, EventProposal, Location, TimeWindow};
use gather_core::error::AppError;
use gather_core::port::EventRepository;

fn proposal(category: &str, city: &str, venue: &str, w: TimeWindow) -> EventProposal {
    EventProposal::new(category, Location::new(city, venue), w)
}

#[tokio::test]
async fn test_venue_conflict_with_suggestions() {
    let h = harness().await;
    h.events
        .insert(&event("gig", "music", "Auckland", "Spark Arena", window(20, 19, 23)))
        .await
        .unwrap();

    let report = h
        .engine()
        .check_conflicts(&proposal("sports", "Auckland", "Spark Arena", window(20, 20, 22)), None)
        .await
        .unwrap();

    assert!(report.has_conflict);
    assert!(!report.degraded);
    assert_eq!(report.conflict_type, Some(ConflictType::SameVenueTime));
    assert_eq!(report.message, "Venue Spark Arena is booked 19:00–23:00 on 2024-03-20");

    // the next day is free at the same hours
    assert_eq!(report.suggestions.alternative_dates[0], window(21, 20, 22));
    // every Auckland venue still shares the city with the gig at that time
    assert!(report.suggestions.alternative_locations.is_empty());
    let nearby: Vec<&str> = report
        .suggestions
        .nearby_venues
        .iter()
        .map(|l| l.venue_name.as_str())
        .collect();
    assert!(nearby.contains(&"Eden Park"));
    assert!(!nearby.contains(&"Spark Arena"));
    assert!(!nearby.contains(&"Te Papa"));
}

#[tokio::test]
async fn test_no_conflict_in_another_city() {
    let h = harness().await;
    h.events
        .insert(&event("gig", "music", "Auckland", "Spark Arena", window(20, 19, 23)))
        .await
        .unwrap();

    let report = h
        .engine()
        .check_conflicts(&proposal("music", "Wellington", "Te Papa", window(20, 19, 23)), None)
        .await
        .unwrap();

    assert!(!report.has_conflict);
    assert_eq!(report.message, ConflictReport::NO_CONFLICT_MESSAGE);
    assert!(report.suggestions.is_empty());
}

#[tokio::test]
async fn test_category_outranks_city_and_closest_first() {
    let h = harness().await;
    h.events
        .insert(&event("market", "food", "Auckland", "Western Springs", window(20, 10, 14)))
        .await
        .unwrap();
    h.events
        .insert(&event("match-late", "sports", "Auckland", "Eden Park", window(20, 13, 16)))
        .await
        .unwrap();
    h.events
        .insert(&event("match-early", "sports", "Auckland", "Eden Park", window(20, 11, 12)))
        .await
        .unwrap();

    let report = h
        .engine()
        .check_conflicts(&proposal("sports", "Auckland", "Spark Arena", window(20, 11, 15)), None)
        .await
        .unwrap();

    assert_eq!(report.conflict_type, Some(ConflictType::SameCategoryTime));
    let order: Vec<&str> = report.conflicts.iter().map(|c| c.against.id()).collect();
    assert_eq!(order, vec!["match-early", "match-late", "market"]);
    assert!(report.message.ends_with("(+2 more)"));
}

#[tokio::test]
async fn test_touching_windows_do_not_conflict() {
    let h = harness().await;
    h.events
        .insert(&event("morning", "music", "Auckland", "Spark Arena", window(20, 9, 12)))
        .await
        .unwrap();

    let report = h
        .engine()
        .check_conflicts(&proposal("music", "Auckland", "Spark Arena", window(20, 12, 15)), None)
        .await
        .unwrap();
    assert!(!report.has_conflict);
}

#[tokio::test]
async fn test_overnight_span_blocks_next_morning() {
    let h = harness().await;
    let overnight = TimeWindow::new(
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 21).unwrap(),
        NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
    )
    .unwrap();
    h.events
        .insert(&event("rave", "music", "Auckland", "Spark Arena", overnight))
        .await
        .unwrap();

    let report = h
        .engine()
        .check_conflicts(&proposal("art", "Auckland", "Spark Arena", window(21, 5, 7)), None)
        .await
        .unwrap();
    assert_eq!(report.conflict_type, Some(ConflictType::SameVenueTime));
    assert!(report.message.ends_with("on 2024-03-21"));
}

#[tokio::test]
async fn test_edit_excludes_the_event_itself_and_cancelled_events() {
    let h = harness().await;
    h.events
        .insert(&event("self", "music", "Auckland", "Spark Arena", window(20, 19, 23)))
        .await
        .unwrap();
    h.events
        .insert(&event("called-off", "music", "Auckland", "Spark Arena", window(20, 19, 23)))
        .await
        .unwrap();
    h.events.cancel("called-off").await.unwrap();

    let report = h
        .engine()
        .check_conflicts(
            &proposal("music", "Auckland", "Spark Arena", window(20, 18, 22)),
            Some("self"),
        )
        .await
        .unwrap();
    assert!(!report.has_conflict);
}

#[tokio::test]
async fn test_active_hold_blocks_until_it_expires() {
    let h = harness().await;
    let hold = h
        .holds
        .create_hold(slot("sports", "Eden Park", window(20, 9, 17)), Duration::minutes(30), "org-1")
        .await
        .unwrap();

    let engine = h.engine();
    let candidate = proposal("music", "Auckland", "Eden Park", window(20, 12, 14));
    let report = engine.check_conflicts(&candidate, None).await.unwrap();
    assert_eq!(report.conflict_type, Some(ConflictType::SameVenueTimeHold));
    assert_eq!(report.conflicts[0].against.id(), hold.id);
    assert!(report.message.ends_with("until 2024-03-14 09:30 UTC"));

    h.clock.advance(Duration::minutes(31));
    let report = engine.check_conflicts(&candidate, None).await.unwrap();
    assert!(!report.has_conflict);
}

#[tokio::test]
async fn test_invalid_window_rejected() {
    let h = harness().await;
    let mut bad = proposal("music", "Auckland", "Spark Arena", window(20, 19, 23));
    bad.window.start_date = NaiveDate::from_ymd_opt(2024, 3, 22).unwrap();

    let err = h.engine().check_conflicts(&bad, None).await.unwrap_err();
    assert!(matches!(err, AppError::Domain(_) | AppError::Validation(_)));
}

#[tokio::test]
async fn test_unreachable_store_gives_degraded_report() {
    let h = harness().await;
    h.pool.close().await;

    let report = h
        .engine()
        .check_conflicts(&proposal("music", "Auckland", "Spark Arena", window(20, 19, 23)), None)
        .await
        .unwrap();
    assert!(report.degraded);
    assert!(!report.has_conflict);
}
