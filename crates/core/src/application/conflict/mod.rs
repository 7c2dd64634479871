//! Conflict Detection Engine - advisory overlap check for a proposed event
//!
//! Scans committed events and unexpired pencil holds around the proposal's
//! window, classifies every overlap, and suggests free alternatives.
//! - Read-only: never writes to any store
//! - Fail-open: a store outage yields a degraded "no conflict" answer

mod classify;
mod suggest;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::application::bounded::bounded;
use crate::domain::{ConflictReport, EventProposal, Occupant, VenueDirectory};
use crate::error::Result;
use crate::port::{CandidateFilter, EventRepository, HoldStore, TimeProvider};

use suggest::SuggestionLimits;

/// Conflict engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Days added on each side of the proposal when scanning candidates
    pub buffer_days: i64,

    /// How many following days to try for alternative dates
    pub alternative_days: i64,

    /// Cap for each suggestion list
    pub max_suggestions: usize,

    /// Timeout for each repository query
    pub query_timeout_ms: u64,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            buffer_days: 1,
            alternative_days: 7,
            max_suggestions: 5,
            query_timeout_ms: 3_000,
        }
    }
}

/// Conflict detection engine
pub struct ConflictDetectionEngine {
    events: Arc<dyn EventRepository>,
    holds: Arc<dyn HoldStore>,
    time_provider: Arc<dyn TimeProvider>,
    venues: VenueDirectory,
    config: ConflictConfig,
}

impl ConflictDetectionEngine {
    pub fn new(
        events: Arc<dyn EventRepository>,
        holds: Arc<dyn HoldStore>,
        time_provider: Arc<dyn TimeProvider>,
        venues: VenueDirectory,
        config: ConflictConfig,
    ) -> Self {
        Self {
            events,
            holds,
            time_provider,
            venues,
            config,
        }
    }

    /// Check a proposal against everything already on the calendar.
    ///
    /// `exclude_id` skips the event being edited. Only validation failures
    /// are returned as `Err`; store failures produce a degraded report.
    pub async fn check_conflicts(
        &self,
        proposal: &EventProposal,
        exclude_id: Option<&str>,
    ) -> Result<ConflictReport> {
        proposal.validate()?;

        let now = self.time_provider.now();
        let timeout = Duration::from_millis(self.config.query_timeout_ms);

        // Alternative dates are re-verified against the same occupant set, so
        // the scan reaches as far as the furthest date we may suggest
        let mut date_range = proposal.window.date_range_with_buffer(self.config.buffer_days);
        if let Some(to) = date_range
            .to
            .checked_add_signed(chrono::Duration::days(self.config.alternative_days))
        {
            date_range.to = to;
        }

        let filter = CandidateFilter {
            city: proposal.location.city.clone(),
            category: proposal.category.clone(),
            venue_name: Some(proposal.location.venue_name.clone()),
            date_range,
            exclude_id: exclude_id.map(str::to_string),
        };

        let events = match bounded(timeout, "find_candidates", self.events.find_candidates(&filter)).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, city = %filter.city, "Event query failed; conflict check degraded");
                return Ok(ConflictReport::degraded(e));
            }
        };

        let mut degraded = false;
        let holds = match bounded(timeout, "find_active_holds", self.holds.find_active(&filter, now)).await {
            Ok(holds) => holds,
            Err(e) => {
                warn!(error = %e, city = %filter.city, "Hold query failed; checking committed events only");
                degraded = true;
                Vec::new()
            }
        };

        let occupants: Vec<Occupant> = events
            .into_iter()
            .filter(|e| !e.is_cancelled() && exclude_id != Some(e.id.as_str()))
            .map(Occupant::Committed)
            .chain(
                holds
                    .into_iter()
                    .filter(|h| !h.is_expired(now) && exclude_id != Some(h.id.as_str()))
                    .map(Occupant::Held),
            )
            .collect();

        debug!(
            occupants = occupants.len(),
            window = %proposal.window,
            "Scanning occupants for conflicts"
        );

        let mut report = classify::build_report(classify::find_conflicts(proposal, &occupants));
        report.degraded = degraded;

        if report.has_conflict {
            report.suggestions = suggest::suggest(
                proposal,
                &occupants,
                &self.venues,
                &SuggestionLimits {
                    alternative_days: self.config.alternative_days,
                    max_suggestions: self.config.max_suggestions,
                },
            );
            info!(
                conflicts = report.conflicts.len(),
                conflict_type = ?report.conflict_type,
                city = %proposal.location.city,
                "Conflicts detected"
            );
        }

        Ok(report)
    }
}
