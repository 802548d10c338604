//! Schedule resolution -- walks flight → operating dates → legs and builds the
//! flat list of download tasks.
//!
//! Each flight is resolved independently: a failure while resolving one flight only
//! drops that flight. The leg structure is looked up lazily, for the first in-range
//! date only, and the outcome is memoized per flight for the rest of the run.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;

use crate::client::RemoteService;
use crate::types::{DateRange, DownloadTask, FlightDate, FlightId, SharedLegMap};

/// Why a flight contributed no tasks
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The schedule lookup failed or returned nothing
    ScheduleUnavailable {
        /// Error message
        error: String,
    },
    /// No operating date fell inside the requested range
    NoDatesInRange,
    /// The leg structure lookup for the first in-range date failed
    LegStructureUnavailable {
        /// Date the lookup was attempted for
        date: FlightDate,
        /// Error message
        error: String,
    },
    /// A repeated flight whose leg structure lookup already failed in this run
    LegStructureFailedEarlier {
        /// First in-range date of this occurrence
        date: FlightDate,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ScheduleUnavailable { error } => {
                write!(f, "schedule unavailable: {error}")
            }
            SkipReason::NoDatesInRange => f.write_str("no operating dates in range"),
            SkipReason::LegStructureUnavailable { date, error } => {
                write!(f, "leg structure unavailable for {date}: {error}")
            }
            SkipReason::LegStructureFailedEarlier { date } => {
                write!(f, "leg structure lookup already failed earlier in this run ({date})")
            }
        }
    }
}

/// A flight dropped during resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedFlight {
    /// Flight that was skipped
    pub flight: FlightId,
    /// Why
    pub reason: SkipReason,
}

/// Output of [`ScheduleResolver::resolve`]
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Tasks in flight order, then date order, then leg order
    pub tasks: Vec<DownloadTask>,
    /// Flights that contributed no tasks
    pub skipped: Vec<SkippedFlight>,
}

/// Per-run, write-once cache of leg structures keyed by flight.
///
/// A slot holds `None` when the single lookup failed; that outcome is reused too,
/// so a flight whose first lookup failed is never looked up again in the run.
#[derive(Debug, Default)]
pub struct LegMapCache {
    slots: HashMap<FlightId, Option<SharedLegMap>>,
}

impl LegMapCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized leg structure, performing the lookup on first access.
    ///
    /// The second element is the lookup error, present only when this call
    /// performed a lookup that failed.
    pub async fn get_or_fetch(
        &mut self,
        service: &dyn RemoteService,
        flight: &FlightId,
        date: FlightDate,
    ) -> (Option<SharedLegMap>, Option<crate::error::Error>) {
        match self.slots.entry(flight.clone()) {
            Entry::Occupied(slot) => (slot.get().clone(), None),
            Entry::Vacant(slot) => match service.fetch_leg_map(flight, date).await {
                Ok(map) => {
                    tracing::debug!(flight = %flight, date = %date, legs = map.len(), "leg structure fetched");
                    let map = SharedLegMap::new(map);
                    slot.insert(Some(map.clone()));
                    (Some(map), None)
                }
                Err(e) => {
                    slot.insert(None);
                    (None, Some(e))
                }
            },
        }
    }

    /// True once a lookup was attempted for `flight`
    pub fn contains(&self, flight: &FlightId) -> bool {
        self.slots.contains_key(flight)
    }
}

/// Builds the download task list for a set of flights and a date range
pub struct ScheduleResolver<'a> {
    service: &'a dyn RemoteService,
    cache: LegMapCache,
}

impl<'a> ScheduleResolver<'a> {
    /// Create a resolver with an empty leg structure cache
    pub fn new(service: &'a dyn RemoteService) -> Self {
        Self {
            service,
            cache: LegMapCache::new(),
        }
    }

    /// Resolve `flights` into download tasks for dates inside `range`.
    ///
    /// Steps per flight:
    /// 1. Fetch the operating dates; on failure skip the flight
    /// 2. Drop dates outside `range`, keeping the service's order
    /// 3. For the first in-range date, look up the leg structure once (memoized,
    ///    including failure)
    /// 4. Emit one task per leg for every in-range date
    pub async fn resolve(&mut self, flights: &[FlightId], range: DateRange) -> Resolution {
        let mut resolution = Resolution::default();

        for flight in flights {
            let dates = match self.service.fetch_schedule(flight).await {
                Ok(dates) => dates,
                Err(e) => {
                    tracing::warn!(flight = %flight, error = %e, "failed fetching schedule, skipping flight");
                    resolution.skipped.push(SkippedFlight {
                        flight: flight.clone(),
                        reason: SkipReason::ScheduleUnavailable {
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let before = resolution.tasks.len();
            let mut in_range = 0usize;
            let mut reported = false;

            for date in dates.into_iter().filter(|d| range.contains(*d)) {
                in_range += 1;

                let (legs, error) = self.cache.get_or_fetch(self.service, flight, date).await;
                let Some(legs) = legs else {
                    // One skip entry per occurrence of the flight
                    if !reported {
                        reported = true;
                        let reason = match error {
                            Some(e) => {
                                tracing::warn!(flight = %flight, date = %date, error = %e, "failed fetching legs");
                                SkipReason::LegStructureUnavailable {
                                    date,
                                    error: e.to_string(),
                                }
                            }
                            None => {
                                tracing::warn!(flight = %flight, date = %date, "leg structure lookup failed earlier, skipping flight");
                                SkipReason::LegStructureFailedEarlier { date }
                            }
                        };
                        resolution.skipped.push(SkippedFlight {
                            flight: flight.clone(),
                            reason,
                        });
                    }
                    continue;
                };
                resolution.tasks.extend(legs.legs().map(|leg| DownloadTask {
                    flight: flight.clone(),
                    date,
                    leg: leg.clone(),
                }));
            }

            if in_range == 0 {
                tracing::info!(flight = %flight, "no operating dates in range");
                resolution.skipped.push(SkippedFlight {
                    flight: flight.clone(),
                    reason: SkipReason::NoDatesInRange,
                });
            } else {
                tracing::debug!(
                    flight = %flight,
                    dates = in_range,
                    tasks = resolution.tasks.len() - before,
                    "flight resolved"
                );
            }
        }

        tracing::info!(
            flights = flights.len(),
            tasks = resolution.tasks.len(),
            skipped = resolution.skipped.len(),
            "schedule resolved"
        );
        resolution
    }
}
