//! Converters between the domain model and wire records.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};

use crate::domain::{RoutePlan, Vehicle, Visit};
use crate::dto::{
    AnalyzeResponse, ConstraintAnalysisDto, ConstraintMatchDto, RoutePlanDto, VehicleDto,
    VisitDto,
};
use crate::error::PlanError;
use crate::score::HardSoftScore;
use crate::scoring::{ConstraintAnalysis, ConstraintTarget};
use crate::session::SolverStatus;

/// Seconds since the Unix epoch of a naive date-time.
pub fn to_seconds(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp()
}

/// Inverse of [`to_seconds`]; out-of-range values map to the epoch.
///
/// ```
/// use dial_a_ride::converters::{from_seconds, to_seconds};
///
/// let time = from_seconds(8 * 3600);
/// assert_eq!(time.to_string(), "1970-01-01 08:00:00");
/// assert_eq!(to_seconds(time), 8 * 3600);
/// ```
pub fn from_seconds(seconds: i64) -> NaiveDateTime {
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

impl RoutePlanDto {
    /// Renders `plan` with every computed field filled in.
    pub fn from_plan(plan: &RoutePlan, solver_status: Option<SolverStatus>) -> Self {
        let vehicles: Vec<VehicleDto> = plan
            .vehicles()
            .iter()
            .enumerate()
            .map(|(idx, vehicle)| vehicle_dto(plan, idx, vehicle))
            .collect();

        let visits: Vec<VisitDto> = plan
            .visits()
            .iter()
            .enumerate()
            .map(|(idx, visit)| visit_dto(plan, idx, visit))
            .collect();

        let start_date_time = plan
            .vehicles()
            .iter()
            .map(|v| v.departure_time)
            .min()
            .map(from_seconds);
        let end_date_time = (0..plan.vehicles().len())
            .filter_map(|idx| plan.vehicle_arrival_time(idx))
            .max()
            .map(from_seconds);

        Self {
            name: plan.name.clone(),
            south_west_corner: Some(plan.south_west_corner),
            north_east_corner: Some(plan.north_east_corner),
            vehicles,
            visits,
            score: plan.score().map(|s| s.to_string()),
            solver_status,
            total_driving_time_seconds: plan.total_driving_time(),
            start_date_time,
            end_date_time,
        }
    }

    /// Builds the domain plan, resolving every id reference.
    ///
    /// # Errors
    ///
    /// [`PlanError::UnknownVisit`] for a route naming a missing visit,
    /// [`PlanError::MalformedPairing`] for a visit flagged both pickup and
    /// drop-off, plus anything [`RoutePlan::new`] rejects.
    pub fn to_domain(&self) -> Result<RoutePlan, PlanError> {
        let visit_ids: HashMap<&str, usize> = self
            .visits
            .iter()
            .enumerate()
            .map(|(idx, v)| (v.id.as_str(), idx))
            .collect();

        let visits = self
            .visits
            .iter()
            .map(VisitDto::to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let vehicles = self
            .vehicles
            .iter()
            .map(|dto| {
                let route = dto
                    .visits
                    .iter()
                    .map(|id| {
                        visit_ids
                            .get(id.as_str())
                            .copied()
                            .ok_or_else(|| PlanError::UnknownVisit(id.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(dto.to_domain().with_route(route))
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        RoutePlan::new(self.name.clone(), visits, vehicles)
    }
}

impl VisitDto {
    fn to_domain(&self) -> Result<Visit, PlanError> {
        if self.is_pickup && self.is_dropoff {
            return Err(PlanError::MalformedPairing {
                visit: self.id.clone(),
                paired: self.paired_visit_id.clone().unwrap_or_default(),
            });
        }

        let mut visit = Visit::new(self.id.clone(), self.name.clone(), self.location)
            .with_demand(self.demand)
            .with_time_window(to_seconds(self.min_start_time), to_seconds(self.max_end_time))
            .with_service_duration(self.service_duration)
            .with_vehicle_type(self.vehicle_type.clone());
        visit.is_pickup = self.is_pickup;
        visit.paired_visit_id = self.paired_visit_id.clone();
        Ok(visit)
    }
}

impl VehicleDto {
    fn to_domain(&self) -> Vehicle {
        let mut vehicle = Vehicle::new(self.id.clone(), self.capacity, self.home_location)
            .with_departure_time(to_seconds(self.departure_time))
            .with_vehicle_type(self.vehicle_type.clone())
            .with_make_model(self.make_model.clone());
        vehicle.driver = self.driver.clone();
        vehicle
    }
}

fn vehicle_dto(plan: &RoutePlan, idx: usize, vehicle: &Vehicle) -> VehicleDto {
    VehicleDto {
        id: vehicle.id.clone(),
        capacity: vehicle.capacity,
        home_location: vehicle.home_location,
        departure_time: from_seconds(vehicle.departure_time),
        vehicle_type: vehicle.vehicle_type.clone(),
        make_model: vehicle.make_model.clone(),
        driver: vehicle.driver.clone(),
        visits: vehicle
            .route()
            .iter()
            .map(|&v| plan.visits()[v].id.clone())
            .collect(),
        total_demand: vehicle.total_demand(),
        total_driving_time_seconds: vehicle.total_driving_time(),
        arrival_time: plan.vehicle_arrival_time(idx).map(from_seconds),
    }
}

fn visit_dto(plan: &RoutePlan, idx: usize, visit: &Visit) -> VisitDto {
    let visit_id = |v: usize| plan.visits()[v].id.clone();
    let owner = visit.vehicle().map(|v| &plan.vehicles()[v]);

    VisitDto {
        id: visit.id.clone(),
        name: visit.name.clone(),
        location: visit.location,
        demand: visit.demand,
        min_start_time: from_seconds(visit.min_start_time),
        max_end_time: from_seconds(visit.max_end_time),
        service_duration: visit.service_duration,
        vehicle_type: visit.vehicle_type.clone(),
        is_pickup: visit.is_pickup(),
        is_dropoff: visit.is_dropoff(),
        paired_visit_id: visit.paired_visit_id.clone(),
        vehicle: owner.map(|v| v.id.clone()),
        vehicle_name: owner.map(|v| v.make_model.clone()),
        previous_visit: visit.previous_visit().map(visit_id),
        next_visit: visit.next_visit().map(visit_id),
        arrival_time: visit.arrival_time().map(from_seconds),
        start_service_time: visit.start_service_time().map(from_seconds),
        departure_time: visit.departure_time().map(from_seconds),
        driving_time_seconds_from_previous_standstill: plan.driving_time_from_previous(idx),
    }
}

impl AnalyzeResponse {
    /// Builds the analysis response for `plan` from a per-constraint breakdown.
    pub fn from_analysis(plan: &RoutePlan, analysis: &[ConstraintAnalysis]) -> Self {
        let score: HardSoftScore = analysis.iter().map(|a| a.score).sum();
        let constraints = analysis
            .iter()
            .map(|a| ConstraintAnalysisDto {
                name: a.name.to_string(),
                weight: a.weight.to_string(),
                score: a.score.to_string(),
                matches: a
                    .matches
                    .iter()
                    .map(|m| ConstraintMatchDto {
                        score: m.score.to_string(),
                        justification: justification(plan, m.target, m.index),
                    })
                    .collect(),
            })
            .collect();

        Self {
            score: score.to_string(),
            constraints,
        }
    }
}

fn justification(plan: &RoutePlan, target: ConstraintTarget, idx: usize) -> String {
    match target {
        ConstraintTarget::Vehicles => {
            let vehicle = &plan.vehicles()[idx];
            format!(
                "vehicle {} (demand {}/{}, {} visits, {}s driving)",
                vehicle.id,
                vehicle.total_demand(),
                vehicle.capacity,
                vehicle.route().len(),
                vehicle.total_driving_time()
            )
        }
        ConstraintTarget::Visits => {
            let visit = &plan.visits()[idx];
            match visit.vehicle() {
                Some(v) => format!(
                    "visit {} on vehicle {} arriving {}",
                    visit.id,
                    plan.vehicles()[v].id,
                    visit
                        .arrival_time()
                        .map_or_else(|| "-".to_string(), |t| from_seconds(t).format("%H:%M:%S").to_string())
                ),
                None => format!("visit {} (unassigned)", visit.id),
            }
        }
    }
}
