//! Constraint definitions for pickup and drop-off routing.
//!
//! # Constraints
//!
//! - **Vehicle capacity** (hard): total demand over capacity, per unit
//! - **Pickup and drop-off same vehicle** (hard): trip split across vehicles
//! - **Pickup before drop-off** (hard): drop-off precedes its pickup
//! - **Pickup immediately before drop-off** (hard): pickup not followed by its drop-off
//! - **Vehicle type** (hard): visit needs another vehicle type
//! - **Arrival window** (hard): arrival outside `[min_start_time, max_end_time]`
//! - **Use more vehicles** (hard): idle vehicle
//! - **Travel time** (soft): see [`TravelObjective`]
//!
//! Pair constraints are anchored on the pickup so each trip counts once.

use serde::{Deserialize, Serialize};

use crate::domain::RoutePlan;
use crate::geometry::driving_time;
use crate::score::HardSoftScore;
use crate::scoring::{ConstraintSet, ConstraintStream};

pub const VEHICLE_CAPACITY: &str = "vehicleCapacity";
pub const PICKUP_AND_DROPOFF_SAME_VEHICLE: &str = "pickupAndDropoffSameVehicle";
pub const PICKUP_BEFORE_DROPOFF: &str = "pickupBeforeDropoff";
pub const PICKUP_IMMEDIATELY_BEFORE_DROPOFF: &str = "pickupImmediatelyBeforeDropoff";
pub const VEHICLE_TYPE: &str = "vehicleTypeConstraint";
pub const VALID_ARRIVAL_TIME: &str = "enforceValidArrivalTime";
pub const USE_MORE_VEHICLES: &str = "useMoreVehicles";
pub const MINIMIZE_TRAVEL_TIME: &str = "minimizeTravelTime";

/// Hard penalty for each broken pickup/drop-off pairing rule.
pub const PAIRING_PENALTY: i64 = 100_000;
pub const VEHICLE_TYPE_PENALTY: i64 = 10_000;
pub const IDLE_VEHICLE_PENALTY: i64 = 500;
/// Flat hard penalty once an arrival is more than [`ARRIVAL_TOLERANCE_MINUTES`] off.
pub const LATE_ARRIVAL_PENALTY: i64 = 10_000;
pub const ARRIVAL_TOLERANCE_MINUTES: i64 = 10;
pub const PENALTY_PER_MINUTE: i64 = 100;

/// Soft objective on travel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TravelObjective {
    /// Rewards `max(1, driving time)` of every leg between consecutive visits.
    #[default]
    RewardLegs,
    /// Penalizes each vehicle's total round-trip driving time.
    PenalizeDrivingTime,
}

/// Scoring options.
///
/// ```
/// use dial_a_ride::constraints::{ScoringConfig, TravelObjective};
///
/// let config: ScoringConfig = serde_json::from_str(r#"{"travelObjective": "penalizeDrivingTime"}"#).unwrap();
/// assert_eq!(config.travel_objective, TravelObjective::PenalizeDrivingTime);
/// assert_eq!(ScoringConfig::default().travel_objective, TravelObjective::RewardLegs);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    pub travel_objective: TravelObjective,
}

/// Creates the constraint set with the default [`ScoringConfig`].
///
/// # Examples
///
/// ```
/// use dial_a_ride::constraints::define_constraints;
/// use dial_a_ride::domain::{RoutePlan, Vehicle, Visit};
/// use dial_a_ride::geometry::Location;
///
/// let home = Location::new(0.0, 0.0);
/// let visits = vec![
///     Visit::new("p1", "Pickup", Location::new(0.0, 0.01)).with_demand(1).pickup_for("d1"),
///     Visit::new("d1", "Dropoff", Location::new(0.0, 0.02)).with_demand(-1).dropoff_for("p1"),
/// ];
/// let vehicles = vec![Vehicle::new("v1", 4, home).with_route(vec![0, 1])];
/// let plan = RoutePlan::new("demo", visits, vehicles).unwrap();
///
/// let score = define_constraints().evaluate_all(&plan);
/// assert!(score.is_feasible());
/// assert_eq!(score.soft(), 40); // one leg rewarded: p1 -> d1
/// ```
pub fn define_constraints() -> ConstraintSet {
    define_constraints_with(&ScoringConfig::default())
}

/// Creates the constraint set for `config`.
pub fn define_constraints_with(config: &ScoringConfig) -> ConstraintSet {
    // HARD: Vehicle capacity - penalize excess demand
    let vehicle_capacity = ConstraintStream::for_each_vehicle()
        .filter(|plan, v| plan.vehicles()[v].excess_demand() > 0)
        .penalize_with(HardSoftScore::ONE_HARD, |plan, v| {
            plan.vehicles()[v].excess_demand() as i64
        })
        .as_constraint(VEHICLE_CAPACITY);

    // HARD: Both halves of a trip ride the same vehicle, counted once per trip
    let same_vehicle = ConstraintStream::for_each_visit()
        .filter(|plan, v| match assigned_trip(plan, v) {
            Some((pickup, dropoff)) => {
                plan.visits()[pickup].vehicle() != plan.visits()[dropoff].vehicle()
            }
            None => false,
        })
        .penalize(HardSoftScore::of_hard(PAIRING_PENALTY))
        .as_constraint(PICKUP_AND_DROPOFF_SAME_VEHICLE);

    // HARD: Drop-off comes after its pickup
    let pickup_before_dropoff = ConstraintStream::for_each_visit()
        .filter(|plan, v| {
            shared_trip(plan, v)
                .is_some_and(|(pickup, dropoff)| is_dropoff_before_pickup(plan, pickup, dropoff))
        })
        .penalize(HardSoftScore::of_hard(PAIRING_PENALTY))
        .as_constraint(PICKUP_BEFORE_DROPOFF);

    // HARD: Drop-off comes right after its pickup
    let pickup_immediately_before_dropoff = ConstraintStream::for_each_visit()
        .filter(|plan, v| {
            shared_trip(plan, v)
                .is_some_and(|(pickup, dropoff)| plan.visits()[pickup].next_visit() != Some(dropoff))
        })
        .penalize(HardSoftScore::of_hard(PAIRING_PENALTY))
        .as_constraint(PICKUP_IMMEDIATELY_BEFORE_DROPOFF);

    // HARD: Visit served by the vehicle type it needs
    let vehicle_type = ConstraintStream::for_each_visit()
        .filter(|plan, v| {
            let visit = &plan.visits()[v];
            visit
                .vehicle()
                .is_some_and(|owner| plan.vehicles()[owner].vehicle_type != visit.vehicle_type)
        })
        .penalize(HardSoftScore::of_hard(VEHICLE_TYPE_PENALTY))
        .as_constraint(VEHICLE_TYPE);

    // HARD: Arrival inside the time window, tiered by deviation
    let arrival_window = ConstraintStream::for_each_visit()
        .filter(|plan, v| plan.visits()[v].arrival_deviation() > 0)
        .penalize_with(HardSoftScore::ONE_HARD, |plan, v| {
            arrival_window_penalty(plan.visits()[v].arrival_deviation())
        })
        .as_constraint(VALID_ARRIVAL_TIME);

    // HARD: Every vehicle should be used
    let use_more_vehicles = ConstraintStream::for_each_vehicle()
        .filter(|plan, v| plan.vehicles()[v].route().is_empty())
        .penalize(HardSoftScore::of_hard(IDLE_VEHICLE_PENALTY))
        .as_constraint(USE_MORE_VEHICLES);

    // SOFT: Travel time
    let travel_time = match config.travel_objective {
        TravelObjective::RewardLegs => ConstraintStream::for_each_visit()
            .filter(|plan, v| plan.visits()[v].previous_visit().is_some())
            .reward_with(HardSoftScore::ONE_SOFT, |plan, v| {
                let visit = &plan.visits()[v];
                visit.previous_visit().map_or(1, |prev| {
                    driving_time(&plan.visits()[prev].location, &visit.location).max(1)
                })
            })
            .as_constraint(MINIMIZE_TRAVEL_TIME),
        TravelObjective::PenalizeDrivingTime => ConstraintStream::for_each_vehicle()
            .filter(|plan, v| plan.vehicles()[v].total_driving_time() > 0)
            .penalize_with(HardSoftScore::ONE_SOFT, |plan, v| {
                plan.vehicles()[v].total_driving_time()
            })
            .as_constraint(MINIMIZE_TRAVEL_TIME),
    };

    ConstraintSet::new(vec![
        vehicle_capacity,
        same_vehicle,
        pickup_before_dropoff,
        vehicle_type,
        arrival_window,
        pickup_immediately_before_dropoff,
        use_more_vehicles,
        travel_time,
    ])
}

/// Full-rescan score of `plan` with the default constraints.
pub fn calculate_score(plan: &RoutePlan) -> HardSoftScore {
    define_constraints().evaluate_all(plan)
}

/// Hard penalty magnitude for an arrival `deviation` seconds outside the window.
///
/// Whole minutes count; beyond [`ARRIVAL_TOLERANCE_MINUTES`] the flat
/// [`LATE_ARRIVAL_PENALTY`] applies.
///
/// ```
/// use dial_a_ride::constraints::arrival_window_penalty;
///
/// assert_eq!(arrival_window_penalty(5 * 60), 500);
/// assert_eq!(arrival_window_penalty(10 * 60), 1_000);
/// assert_eq!(arrival_window_penalty(15 * 60), 10_000);
/// ```
pub fn arrival_window_penalty(deviation: i64) -> i64 {
    let minutes = deviation / 60;
    if minutes > ARRIVAL_TOLERANCE_MINUTES {
        LATE_ARRIVAL_PENALTY
    } else {
        PENALTY_PER_MINUTE * minutes
    }
}

/// Returns true if `dropoff` is not preceded by `pickup` in its route.
///
/// Walks backward from the drop-off through `previous_visit`.
pub fn is_dropoff_before_pickup(plan: &RoutePlan, pickup: usize, dropoff: usize) -> bool {
    let mut current = plan.visits()[dropoff].previous_visit();
    while let Some(idx) = current {
        if idx == pickup {
            return false;
        }
        current = plan.visits()[idx].previous_visit();
    }
    true
}

/// `(pickup, dropoff)` when `v` is a pickup and both halves are assigned.
fn assigned_trip(plan: &RoutePlan, v: usize) -> Option<(usize, usize)> {
    let visit = &plan.visits()[v];
    if !visit.is_pickup() || visit.vehicle().is_none() {
        return None;
    }
    let dropoff = visit.paired_visit()?;
    plan.visits()[dropoff].vehicle().map(|_| (v, dropoff))
}

/// Like [`assigned_trip`], restricted to trips on a single vehicle.
fn shared_trip(plan: &RoutePlan, v: usize) -> Option<(usize, usize)> {
    assigned_trip(plan, v).filter(|&(pickup, dropoff)| {
        plan.visits()[pickup].vehicle() == plan.visits()[dropoff].vehicle()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Vehicle, Visit};
    use crate::geometry::Location;
    use crate::scoring::ConstraintAnalysis;

    const HOME: Location = Location::new(0.0, 0.0);

    fn constraint_score(plan: &RoutePlan, name: &str) -> HardSoftScore {
        define_constraints()
            .analyze(plan)
            .into_iter()
            .find(|a: &ConstraintAnalysis| a.name == name)
            .map(|a| a.score)
            .unwrap()
    }

    fn trip_visits() -> Vec<Visit> {
        vec![
            Visit::new("p", "Pickup", Location::new(0.0, 0.01))
                .with_demand(2)
                .pickup_for("d"),
            Visit::new("d", "Dropoff", Location::new(0.0, 0.02))
                .with_demand(-2)
                .dropoff_for("p"),
        ]
    }

    #[test]
    fn test_capacity_penalizes_excess_once() {
        let visits = (0..3)
            .map(|i| Visit::new(format!("v{i}"), "", Location::new(0.0, 0.01)).with_demand(4))
            .collect();
        let vehicles = vec![Vehicle::new("van", 10, HOME).with_route(vec![0, 1, 2])];
        let plan = RoutePlan::new("t", visits, vehicles).unwrap();

        assert_eq!(constraint_score(&plan, VEHICLE_CAPACITY), HardSoftScore::of_hard(-2));
    }

    #[test]
    fn test_pair_in_order_is_free() {
        let vehicles = vec![Vehicle::new("van", 10, HOME).with_route(vec![0, 1])];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();

        assert_eq!(constraint_score(&plan, PICKUP_BEFORE_DROPOFF), HardSoftScore::ZERO);
        assert_eq!(
            constraint_score(&plan, PICKUP_IMMEDIATELY_BEFORE_DROPOFF),
            HardSoftScore::ZERO
        );
        assert_eq!(
            constraint_score(&plan, PICKUP_AND_DROPOFF_SAME_VEHICLE),
            HardSoftScore::ZERO
        );
    }

    #[test]
    fn test_pair_swapped_breaks_both_order_rules() {
        let vehicles = vec![Vehicle::new("van", 10, HOME).with_route(vec![1, 0])];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();

        assert_eq!(
            constraint_score(&plan, PICKUP_BEFORE_DROPOFF),
            HardSoftScore::of_hard(-PAIRING_PENALTY)
        );
        assert_eq!(
            constraint_score(&plan, PICKUP_IMMEDIATELY_BEFORE_DROPOFF),
            HardSoftScore::of_hard(-PAIRING_PENALTY)
        );
    }

    #[test]
    fn test_pair_with_stop_between() {
        let mut visits = trip_visits();
        visits.push(Visit::new("x", "Other", Location::new(0.0, 0.015)));
        let vehicles = vec![Vehicle::new("van", 10, HOME).with_route(vec![0, 2, 1])];
        let plan = RoutePlan::new("t", visits, vehicles).unwrap();

        assert_eq!(constraint_score(&plan, PICKUP_BEFORE_DROPOFF), HardSoftScore::ZERO);
        assert_eq!(
            constraint_score(&plan, PICKUP_IMMEDIATELY_BEFORE_DROPOFF),
            HardSoftScore::of_hard(-PAIRING_PENALTY)
        );
    }

    #[test]
    fn test_pair_split_across_vehicles() {
        let vehicles = vec![
            Vehicle::new("a", 10, HOME).with_route(vec![0]),
            Vehicle::new("b", 10, HOME).with_route(vec![1]),
        ];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();

        assert_eq!(
            constraint_score(&plan, PICKUP_AND_DROPOFF_SAME_VEHICLE),
            HardSoftScore::of_hard(-PAIRING_PENALTY)
        );
        // Order rules only apply on a shared vehicle.
        assert_eq!(constraint_score(&plan, PICKUP_BEFORE_DROPOFF), HardSoftScore::ZERO);
        assert_eq!(
            constraint_score(&plan, PICKUP_IMMEDIATELY_BEFORE_DROPOFF),
            HardSoftScore::ZERO
        );
    }

    #[test]
    fn test_half_assigned_pair_is_free() {
        let vehicles = vec![Vehicle::new("a", 10, HOME).with_route(vec![1])];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();
        for name in [
            PICKUP_AND_DROPOFF_SAME_VEHICLE,
            PICKUP_BEFORE_DROPOFF,
            PICKUP_IMMEDIATELY_BEFORE_DROPOFF,
        ] {
            assert_eq!(constraint_score(&plan, name), HardSoftScore::ZERO);
        }
    }

    #[test]
    fn test_vehicle_type_mismatch() {
        let visits = vec![
            Visit::new("a", "", Location::new(0.0, 0.01)).with_vehicle_type("wheelchair"),
            Visit::new("b", "", Location::new(0.0, 0.02)).with_vehicle_type("sedan"),
            Visit::new("c", "", Location::new(0.0, 0.03)).with_vehicle_type("sedan"),
        ];
        let vehicles = vec![Vehicle::new("car", 10, HOME)
            .with_vehicle_type("sedan")
            .with_route(vec![0, 1])];
        let plan = RoutePlan::new("t", visits, vehicles).unwrap();

        // Unassigned "c" never counts.
        assert_eq!(
            constraint_score(&plan, VEHICLE_TYPE),
            HardSoftScore::of_hard(-VEHICLE_TYPE_PENALTY)
        );
    }

    fn window_plan(arrival_offset: i64) -> RoutePlan {
        // Home to visit is 40s; departure chosen so arrival = 9:00 + offset.
        let visit = Visit::new("a", "", Location::new(0.0, 0.01)).with_time_window(9 * 3600, 10 * 3600);
        let vehicle = Vehicle::new("car", 10, HOME)
            .with_departure_time(9 * 3600 + arrival_offset - 40)
            .with_route(vec![0]);
        RoutePlan::new("t", vec![visit], vec![vehicle]).unwrap()
    }

    #[test]
    fn test_arrival_window_tiers() {
        let cases = [
            (0, 0),
            (-5 * 60, -500),
            (-10 * 60, -1_000),
            (-(10 * 60 + 59), -1_000),
            (-11 * 60, -10_000),
            (-15 * 60, -10_000),
            (3600 + 5 * 60, -10_000),
            (3600 + 15 * 60, -10_000),
        ];
        for (offset, expected) in cases {
            let plan = window_plan(offset);
            assert_eq!(
                constraint_score(&plan, VALID_ARRIVAL_TIME),
                HardSoftScore::of_hard(expected),
                "arrival offset {offset}"
            );
        }
    }

    #[test]
    fn test_late_arrival_counts_from_window_start() {
        // Window 9:00..9:05, arriving 9:07 is 7 minutes after the start.
        let visit = Visit::new("a", "", Location::new(0.0, 0.01))
            .with_time_window(9 * 3600, 9 * 3600 + 5 * 60);
        let vehicle = Vehicle::new("car", 10, HOME)
            .with_departure_time(9 * 3600 + 7 * 60 - 40)
            .with_route(vec![0]);
        let plan = RoutePlan::new("t", vec![visit], vec![vehicle]).unwrap();

        assert_eq!(plan.visits()[0].arrival_deviation(), 7 * 60);
        assert_eq!(
            constraint_score(&plan, VALID_ARRIVAL_TIME),
            HardSoftScore::of_hard(-700)
        );
    }

    #[test]
    fn test_idle_vehicle_penalized() {
        let vehicles = vec![
            Vehicle::new("busy", 10, HOME).with_route(vec![0, 1]),
            Vehicle::new("idle", 10, HOME),
        ];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();
        assert_eq!(
            constraint_score(&plan, USE_MORE_VEHICLES),
            HardSoftScore::of_hard(-IDLE_VEHICLE_PENALTY)
        );
    }

    #[test]
    fn test_travel_objectives() {
        let vehicles = vec![Vehicle::new("van", 10, HOME).with_route(vec![0, 1])];
        let mut visits = trip_visits();
        visits.push(Visit::new("same", "", Location::new(0.0, 0.02)));
        let vehicles = vec![vehicles[0].clone().with_route(vec![0, 1, 2])];
        let plan = RoutePlan::new("t", visits, vehicles).unwrap();

        // p -> d is 40s, d -> same is 0s but still rewarded 1.
        assert_eq!(constraint_score(&plan, MINIMIZE_TRAVEL_TIME), HardSoftScore::of_soft(41));

        let penalize = define_constraints_with(&ScoringConfig {
            travel_objective: TravelObjective::PenalizeDrivingTime,
        });
        // 40 + 40 + 0 + 80 back home
        assert_eq!(penalize.evaluate_all(&plan), HardSoftScore::of(0, -160));
    }

    #[test]
    fn test_unassigned_plan_only_idle_penalty() {
        let vehicles = vec![Vehicle::new("van", 10, HOME)];
        let plan = RoutePlan::new("t", trip_visits(), vehicles).unwrap();
        assert_eq!(calculate_score(&plan), HardSoftScore::of_hard(-IDLE_VEHICLE_PENALTY));
    }
}
