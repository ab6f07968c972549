//! Domain model for pickup and drop-off routing.
//!
//! # Overview
//!
//! - [`Visit`]s are stops: the pickup or the drop-off half of a trip
//! - [`Vehicle`]s own an ordered route of visit indices
//! - [`RoutePlan`] is the arena holding both, plus the current score
//!
//! # Design
//!
//! Entities are addressed by their index in the plan's arena. Each vehicle's
//! route is the single source of truth; the shadow fields on visits
//! (`vehicle`, `previous_visit`, `next_visit`, `arrival_time`) and the cached
//! aggregates on vehicles are derived from it by the shadow engine and are
//! never written anywhere else.
//!
//! All times are integer seconds.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::error::PlanError;
use crate::geometry::{bounding_box, driving_time, Location};
use crate::score::HardSoftScore;

/// One stop of a trip.
///
/// # Time Window
///
/// - `min_start_time`: earliest time service may begin (the vehicle waits)
/// - `max_end_time`: latest acceptable arrival
/// - `service_duration`: time spent at the stop
///
/// # Examples
///
/// ```
/// use dial_a_ride::domain::Visit;
/// use dial_a_ride::geometry::Location;
///
/// let pickup = Visit::new("p1", "Alice home", Location::new(39.95, -75.17))
///     .with_demand(1)
///     .with_time_window(8 * 3600, 9 * 3600)
///     .with_service_duration(120)
///     .pickup_for("d1");
///
/// assert!(pickup.is_pickup());
/// assert_eq!(pickup.paired_visit_id.as_deref(), Some("d1"));
/// assert_eq!(pickup.vehicle(), None); // unassigned until routed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// Stable unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    pub location: Location,
    /// Positive for a pickup, the negated amount for its drop-off.
    pub demand: i32,
    pub min_start_time: i64,
    pub max_end_time: i64,
    pub service_duration: i64,
    /// Vehicle type this visit requires.
    pub vehicle_type: String,
    pub is_pickup: bool,
    /// Id of the other half of the trip.
    pub paired_visit_id: Option<String>,

    // Resolved by `RoutePlan::new`.
    pub(crate) paired_visit: Option<usize>,

    // Shadow variables, maintained by the shadow engine only.
    pub(crate) vehicle: Option<usize>,
    pub(crate) previous_visit: Option<usize>,
    pub(crate) next_visit: Option<usize>,
    pub(crate) arrival_time: Option<i64>,
}

impl Visit {
    /// Creates an unpaired visit with an all-day window and unit demand.
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            demand: 1,
            min_start_time: 0,
            max_end_time: 24 * 3600,
            service_duration: 0,
            vehicle_type: String::new(),
            is_pickup: false,
            paired_visit_id: None,
            paired_visit: None,
            vehicle: None,
            previous_visit: None,
            next_visit: None,
            arrival_time: None,
        }
    }

    pub fn with_demand(mut self, demand: i32) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_time_window(mut self, min_start: i64, max_end: i64) -> Self {
        self.min_start_time = min_start;
        self.max_end_time = max_end;
        self
    }

    pub fn with_service_duration(mut self, duration: i64) -> Self {
        self.service_duration = duration;
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = vehicle_type.into();
        self
    }

    /// Marks this visit as the pickup of the trip whose drop-off is `dropoff_id`.
    pub fn pickup_for(mut self, dropoff_id: impl Into<String>) -> Self {
        self.is_pickup = true;
        self.paired_visit_id = Some(dropoff_id.into());
        self
    }

    /// Marks this visit as the drop-off of the trip whose pickup is `pickup_id`.
    pub fn dropoff_for(mut self, pickup_id: impl Into<String>) -> Self {
        self.is_pickup = false;
        self.paired_visit_id = Some(pickup_id.into());
        self
    }

    #[inline]
    pub fn is_pickup(&self) -> bool {
        self.is_pickup
    }

    #[inline]
    pub fn is_dropoff(&self) -> bool {
        !self.is_pickup && self.paired_visit_id.is_some()
    }

    /// Index of the paired visit in the plan.
    #[inline]
    pub fn paired_visit(&self) -> Option<usize> {
        self.paired_visit
    }

    /// Index of the vehicle whose route holds this visit.
    #[inline]
    pub fn vehicle(&self) -> Option<usize> {
        self.vehicle
    }

    #[inline]
    pub fn previous_visit(&self) -> Option<usize> {
        self.previous_visit
    }

    #[inline]
    pub fn next_visit(&self) -> Option<usize> {
        self.next_visit
    }

    #[inline]
    pub fn arrival_time(&self) -> Option<i64> {
        self.arrival_time
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.vehicle.is_some()
    }

    /// Time service begins: the vehicle waits for `min_start_time`.
    #[inline]
    pub fn start_service_time(&self) -> Option<i64> {
        self.arrival_time.map(|arrival| arrival.max(self.min_start_time))
    }

    /// Time the vehicle leaves this visit.
    #[inline]
    pub fn departure_time(&self) -> Option<i64> {
        self.start_service_time()
            .map(|start| start + self.service_duration)
    }

    /// Seconds an arrival outside `[min_start_time, max_end_time]` deviates
    /// from `min_start_time`.
    ///
    /// An early arrival counts the wait until `min_start_time`; a late one
    /// counts from `min_start_time` too, not from `max_end_time`. Zero when on
    /// time or unassigned.
    ///
    /// ```
    /// use dial_a_ride::domain::Visit;
    /// use dial_a_ride::geometry::Location;
    ///
    /// let visit = Visit::new("a", "A", Location::new(0.0, 0.0))
    ///     .with_time_window(8 * 3600, 9 * 3600);
    /// assert_eq!(visit.arrival_deviation(), 0);
    /// ```
    #[inline]
    pub fn arrival_deviation(&self) -> i64 {
        match self.arrival_time {
            Some(arrival) if arrival < self.min_start_time => self.min_start_time - arrival,
            Some(arrival) if arrival > self.max_end_time => arrival - self.min_start_time,
            _ => 0,
        }
    }
}

/// A vehicle with a home base and an ordered route.
///
/// # Examples
///
/// ```
/// use dial_a_ride::domain::Vehicle;
/// use dial_a_ride::geometry::Location;
///
/// let van = Vehicle::new("van-1", 6, Location::new(39.95, -75.17))
///     .with_departure_time(7 * 3600)
///     .with_vehicle_type("wheelchair")
///     .with_make_model("Ford Transit");
///
/// assert_eq!(van.capacity, 6);
/// assert!(van.route().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    /// Stable unique id.
    pub id: String,
    pub capacity: i32,
    pub home_location: Location,
    pub departure_time: i64,
    pub vehicle_type: String,
    /// Display metadata.
    pub make_model: String,
    pub driver: Option<String>,

    /// Ordered visit indices; only edit primitives touch this.
    pub(crate) visits: Vec<usize>,

    // Cached aggregates, maintained by the shadow engine.
    pub(crate) cached_total_demand: i32,
    pub(crate) cached_driving_time: i64,
}

impl Vehicle {
    /// Creates a vehicle with an empty route departing at 8am.
    pub fn new(id: impl Into<String>, capacity: i32, home_location: Location) -> Self {
        Self {
            id: id.into(),
            capacity,
            home_location,
            departure_time: 8 * 3600,
            vehicle_type: String::new(),
            make_model: String::new(),
            driver: None,
            visits: Vec::new(),
            cached_total_demand: 0,
            cached_driving_time: 0,
        }
    }

    pub fn with_departure_time(mut self, time: i64) -> Self {
        self.departure_time = time;
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = vehicle_type.into();
        self
    }

    pub fn with_make_model(mut self, make_model: impl Into<String>) -> Self {
        self.make_model = make_model.into();
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    /// Sets the initial route as visit indices.
    ///
    /// Validated when the vehicle is handed to [`RoutePlan::new`].
    pub fn with_route(mut self, visits: Vec<usize>) -> Self {
        self.visits = visits;
        self
    }

    /// The route as visit indices, in driving order.
    #[inline]
    pub fn route(&self) -> &[usize] {
        &self.visits
    }

    /// Sum of the demands of all visits in the route.
    #[inline]
    pub fn total_demand(&self) -> i32 {
        self.cached_total_demand
    }

    /// Demand over capacity, 0 when within capacity.
    #[inline]
    pub fn excess_demand(&self) -> i32 {
        (self.cached_total_demand - self.capacity).max(0)
    }

    /// Home to each visit in order and back home, in seconds.
    ///
    /// Zero for an empty route.
    #[inline]
    pub fn total_driving_time(&self) -> i64 {
        self.cached_driving_time
    }
}

/// The complete routing solution: fleet, visit pool and current score.
///
/// # Lifecycle
///
/// Built once per request with [`RoutePlan::new`], mutated in place through
/// the edit primitives in [`crate::route`] (usually via a
/// [`ScoreDirector`](crate::director::ScoreDirector)), then frozen with a
/// final score. `Clone` produces an independent deep copy.
///
/// # Examples
///
/// ```
/// use dial_a_ride::domain::{RoutePlan, Vehicle, Visit};
/// use dial_a_ride::geometry::Location;
///
/// let home = Location::new(0.0, 0.0);
/// let visits = vec![
///     Visit::new("p1", "Pickup", Location::new(0.0, 0.01)).with_demand(1).pickup_for("d1"),
///     Visit::new("d1", "Dropoff", Location::new(0.0, 0.02)).with_demand(-1).dropoff_for("p1"),
/// ];
/// let vehicles = vec![Vehicle::new("v1", 4, home).with_route(vec![0, 1])];
///
/// let plan = RoutePlan::new("demo", visits, vehicles).unwrap();
///
/// assert_eq!(plan.visits()[0].vehicle(), Some(0));
/// assert_eq!(plan.visits()[0].next_visit(), Some(1));
/// assert_eq!(plan.visits()[1].previous_visit(), Some(0));
/// // 8am departure + 40s to the pickup
/// assert_eq!(plan.visits()[0].arrival_time(), Some(8 * 3600 + 40));
/// ```
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub name: String,
    /// Display only.
    pub south_west_corner: Location,
    /// Display only.
    pub north_east_corner: Location,
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) visits: Vec<Visit>,
    pub(crate) score: Option<HardSoftScore>,
    visit_ids: HashMap<String, usize>,
    vehicle_ids: HashMap<String, usize>,
}

impl RoutePlan {
    /// Builds a plan, resolving pairings and initial routes.
    ///
    /// # Errors
    ///
    /// - [`PlanError::DuplicateId`] if two visits or two vehicles share an id
    /// - [`PlanError::MalformedPairing`] if a paired id is missing, points at
    ///   the visit itself, is not reciprocated, or the pair is not exactly one
    ///   pickup and one drop-off
    /// - [`PlanError::UnknownVisit`] / [`PlanError::AlreadyAssigned`] if a
    ///   vehicle route references a missing visit or a visit twice
    pub fn new(
        name: impl Into<String>,
        mut visits: Vec<Visit>,
        mut vehicles: Vec<Vehicle>,
    ) -> Result<Self, PlanError> {
        let name = name.into();

        let visit_ids = index_ids(visits.iter().map(|v| v.id.as_str()))?;
        let vehicle_ids = index_ids(vehicles.iter().map(|v| v.id.as_str()))?;

        let paired = resolve_pairs(&visits, &visit_ids)?;
        for (visit, paired_idx) in visits.iter_mut().zip(paired) {
            visit.paired_visit = paired_idx;
        }

        let mut seen = vec![false; visits.len()];
        for vehicle in &vehicles {
            for &idx in &vehicle.visits {
                let Some(slot) = seen.get_mut(idx) else {
                    return Err(PlanError::UnknownVisit(idx.to_string()));
                };
                if *slot {
                    return Err(PlanError::AlreadyAssigned(visits[idx].id.clone()));
                }
                *slot = true;
            }
        }

        // Incoming shadow values are never trusted.
        for visit in &mut visits {
            visit.vehicle = None;
            visit.previous_visit = None;
            visit.next_visit = None;
            visit.arrival_time = None;
        }
        for vehicle in &mut vehicles {
            vehicle.cached_total_demand = 0;
            vehicle.cached_driving_time = 0;
        }

        let (south_west_corner, north_east_corner) = bounding_box(
            visits
                .iter()
                .map(|v| v.location)
                .chain(vehicles.iter().map(|v| v.home_location)),
        );

        let mut plan = Self {
            name,
            south_west_corner,
            north_east_corner,
            vehicles,
            visits,
            score: None,
            visit_ids,
            vehicle_ids,
        };
        plan.update_shadows();

        debug!(
            plan = %plan.name,
            vehicles = plan.vehicles.len(),
            visits = plan.visits.len(),
            assigned = plan.assigned_count(),
            "Route plan loaded"
        );

        Ok(plan)
    }

    #[inline]
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    #[inline]
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    #[inline]
    pub fn get_vehicle(&self, idx: usize) -> Option<&Vehicle> {
        self.vehicles.get(idx)
    }

    #[inline]
    pub fn get_visit(&self, idx: usize) -> Option<&Visit> {
        self.visits.get(idx)
    }

    /// Looks up a visit index by id.
    pub fn visit_index(&self, id: &str) -> Option<usize> {
        self.visit_ids.get(id).copied()
    }

    /// Looks up a vehicle index by id.
    pub fn vehicle_index(&self, id: &str) -> Option<usize> {
        self.vehicle_ids.get(id).copied()
    }

    /// Last computed score; cleared by every structural edit.
    #[inline]
    pub fn score(&self) -> Option<HardSoftScore> {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: HardSoftScore) {
        self.score = Some(score);
    }

    /// Number of visits currently on some route.
    pub fn assigned_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.visits.len()).sum()
    }

    /// Indices of visits on no route.
    pub fn unassigned_visits(&self) -> impl Iterator<Item = usize> + '_ {
        self.visits
            .iter()
            .enumerate()
            .filter(|(_, v)| v.vehicle.is_none())
            .map(|(idx, _)| idx)
    }

    /// Seconds driven from the previous stop (home or visit) to `visit_idx`.
    ///
    /// `None` for unassigned visits.
    pub fn driving_time_from_previous(&self, visit_idx: usize) -> Option<i64> {
        let visit = self.visits.get(visit_idx)?;
        let vehicle = &self.vehicles[visit.vehicle?];
        let from = match visit.previous_visit {
            Some(prev) => self.visits[prev].location,
            None => vehicle.home_location,
        };
        Some(driving_time(&from, &visit.location))
    }

    /// Time the vehicle is back home after its last visit.
    ///
    /// Equals the departure time for an empty route.
    pub fn vehicle_arrival_time(&self, vehicle_idx: usize) -> Option<i64> {
        let vehicle = self.vehicles.get(vehicle_idx)?;
        match vehicle.visits.last() {
            None => Some(vehicle.departure_time),
            Some(&last) => {
                let last = &self.visits[last];
                last.departure_time()
                    .map(|dep| dep + driving_time(&last.location, &vehicle.home_location))
            }
        }
    }

    /// Total driving time across the fleet in seconds.
    pub fn total_driving_time(&self) -> i64 {
        self.vehicles.iter().map(Vehicle::total_driving_time).sum()
    }
}

fn index_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<HashMap<String, usize>, PlanError> {
    let mut map = HashMap::new();
    for (idx, id) in ids.enumerate() {
        match map.entry(id.to_string()) {
            Entry::Occupied(_) => return Err(PlanError::DuplicateId(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
        }
    }
    Ok(map)
}

fn resolve_pairs(
    visits: &[Visit],
    visit_ids: &HashMap<String, usize>,
) -> Result<Vec<Option<usize>>, PlanError> {
    visits
        .iter()
        .enumerate()
        .map(|(idx, visit)| {
            let Some(paired_id) = visit.paired_visit_id.as_deref() else {
                return Ok(None);
            };
            let malformed = || PlanError::MalformedPairing {
                visit: visit.id.clone(),
                paired: paired_id.to_string(),
            };
            let paired_idx = *visit_ids.get(paired_id).ok_or_else(malformed)?;
            let paired = &visits[paired_idx];
            let reciprocal = paired.paired_visit_id.as_deref() == Some(visit.id.as_str());
            if paired_idx == idx || !reciprocal || paired.is_pickup == visit.is_pickup {
                return Err(malformed());
            }
            Ok(Some(paired_idx))
        })
        .collect()
}
