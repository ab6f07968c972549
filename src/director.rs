//! Incremental score maintenance.
//!
//! The director owns the working plan and caches every entity's constraint
//! contribution. After an edit only the entities the edit touched are
//! rescored: the dirty vehicles, the dirty visits and their paired visits.
//! The cached total always equals a full rescan of the same plan.

use tracing::{debug, trace};

use crate::constraints::define_constraints;
use crate::domain::RoutePlan;
use crate::error::PlanError;
use crate::route::Edit;
use crate::score::HardSoftScore;
use crate::scoring::ConstraintSet;

/// Working plan plus cached per-entity scores.
///
/// # Examples
///
/// ```
/// use dial_a_ride::director::ScoreDirector;
/// use dial_a_ride::domain::{RoutePlan, Vehicle, Visit};
/// use dial_a_ride::geometry::Location;
/// use dial_a_ride::route::Edit;
///
/// let visits = vec![
///     Visit::new("p", "Pickup", Location::new(0.0, 0.01)).pickup_for("d"),
///     Visit::new("d", "Dropoff", Location::new(0.0, 0.02)).with_demand(-1).dropoff_for("p"),
/// ];
/// let vehicles = vec![Vehicle::new("v1", 4, Location::new(0.0, 0.0))];
/// let plan = RoutePlan::new("demo", visits, vehicles).unwrap();
///
/// let mut director = ScoreDirector::new(plan);
/// assert_eq!(director.score().hard(), -500); // idle vehicle
///
/// director.apply(Edit::Assign { visit: 0, vehicle: 0, position: 0 }).unwrap();
/// let score = director.apply(Edit::Assign { visit: 1, vehicle: 0, position: 1 }).unwrap();
/// assert_eq!(score, director.calculate_score());
/// assert!(score.is_feasible());
/// ```
pub struct ScoreDirector {
    plan: RoutePlan,
    constraints: ConstraintSet,
    vehicle_scores: Vec<HardSoftScore>,
    visit_scores: Vec<HardSoftScore>,
    score: HardSoftScore,
}

impl ScoreDirector {
    /// Creates a director with the default constraints.
    pub fn new(plan: RoutePlan) -> Self {
        Self::with_constraints(plan, define_constraints())
    }

    /// Creates a director with `constraints` and scores the plan from scratch.
    pub fn with_constraints(mut plan: RoutePlan, constraints: ConstraintSet) -> Self {
        let vehicle_scores: Vec<HardSoftScore> = (0..plan.vehicles().len())
            .map(|v| constraints.vehicle_impact(&plan, v))
            .collect();
        let visit_scores: Vec<HardSoftScore> = (0..plan.visits().len())
            .map(|v| constraints.visit_impact(&plan, v))
            .collect();
        let score = vehicle_scores.iter().chain(&visit_scores).copied().sum();
        plan.set_score(score);

        debug!(plan = %plan.name, %score, "Score director initialized");

        Self {
            plan,
            constraints,
            vehicle_scores,
            visit_scores,
            score,
        }
    }

    #[inline]
    pub fn working_solution(&self) -> &RoutePlan {
        &self.plan
    }

    #[inline]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Current score, kept in sync with every applied edit.
    #[inline]
    pub fn score(&self) -> HardSoftScore {
        self.score
    }

    /// Applies `edit` and returns the updated score.
    ///
    /// A failed edit leaves plan and score untouched.
    pub fn apply(&mut self, edit: Edit) -> Result<HardSoftScore, PlanError> {
        let dirty = self.plan.apply(edit)?;

        for &v in &dirty.vehicles {
            let fresh = self.constraints.vehicle_impact(&self.plan, v);
            self.score += fresh - self.vehicle_scores[v];
            self.vehicle_scores[v] = fresh;
        }

        let mut visits = dirty.visits.clone();
        visits.extend(
            dirty
                .visits
                .iter()
                .filter_map(|&v| self.plan.visits()[v].paired_visit()),
        );
        for v in visits {
            let fresh = self.constraints.visit_impact(&self.plan, v);
            self.score += fresh - self.visit_scores[v];
            self.visit_scores[v] = fresh;
        }

        trace!(?edit, score = %self.score, "edit scored");
        self.plan.set_score(self.score);
        Ok(self.score)
    }

    /// Full rescan of the current plan, ignoring the cache.
    pub fn calculate_score(&self) -> HardSoftScore {
        self.constraints.evaluate_all(&self.plan)
    }

    /// Independent copy of the working plan with its score.
    pub fn snapshot(&self) -> RoutePlan {
        self.plan.clone()
    }

    /// Ends the edit sequence and gives back the scored plan.
    ///
    /// The returned plan is treated as read-only with a final score. It still
    /// exposes the edit primitives, and any edit on it clears the score.
    pub fn finish(self) -> RoutePlan {
        debug!(plan = %self.plan.name, score = %self.score, "Score director finished");
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{define_constraints_with, ScoringConfig, TravelObjective};
    use crate::domain::{Vehicle, Visit};
    use crate::geometry::Location;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random plan of trips with every other visit a pickup.
    fn trip_plan(rng: &mut StdRng, n_trips: usize, n_vehicles: usize) -> RoutePlan {
        let mut visits = Vec::with_capacity(n_trips * 2);
        for t in 0..n_trips {
            let start = rng.gen_range(8 * 3600..11 * 3600);
            let kind = if rng.gen_bool(0.2) { "wheelchair" } else { "" };
            let pickup = Location::new(rng.gen_range(0.0..0.2), rng.gen_range(0.0..0.2));
            let dropoff = Location::new(rng.gen_range(0.0..0.2), rng.gen_range(0.0..0.2));
            visits.push(
                Visit::new(format!("p{t}"), "", pickup)
                    .with_demand(rng.gen_range(1..=3))
                    .with_time_window(start, start + 1800)
                    .with_service_duration(60)
                    .with_vehicle_type(kind)
                    .pickup_for(format!("d{t}")),
            );
            visits.push(
                Visit::new(format!("d{t}"), "", dropoff)
                    .with_demand(-1)
                    .with_time_window(start + 600, start + 3600)
                    .with_service_duration(60)
                    .with_vehicle_type(kind)
                    .dropoff_for(format!("p{t}")),
            );
        }
        let vehicles = (0..n_vehicles)
            .map(|i| {
                let kind = if i % 3 == 0 { "wheelchair" } else { "" };
                Vehicle::new(format!("car{i}"), rng.gen_range(2..8), Location::new(0.1, 0.1))
                    .with_vehicle_type(kind)
            })
            .collect();
        RoutePlan::new("random", visits, vehicles).unwrap()
    }

    fn random_edit(rng: &mut StdRng, plan: &RoutePlan) -> Edit {
        let visit = rng.gen_range(0..plan.visits().len());
        let vehicle = rng.gen_range(0..plan.vehicles().len());
        let len = plan.vehicles()[vehicle].route().len();
        match plan.visits()[visit].vehicle() {
            None => Edit::Assign {
                visit,
                vehicle,
                position: rng.gen_range(0..=len),
            },
            Some(_) if rng.gen_bool(0.2) => Edit::Unassign { visit },
            Some(source) => {
                let len = if source == vehicle { len - 1 } else { len };
                Edit::Move {
                    visit,
                    vehicle,
                    position: rng.gen_range(0..=len),
                }
            }
        }
    }

    fn check_incremental(config: &ScoringConfig, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for (trips, vehicles) in [(1, 1), (4, 2), (20, 5), (100, 50)] {
            let plan = trip_plan(&mut rng, trips, vehicles);
            let mut director = ScoreDirector::with_constraints(plan, define_constraints_with(config));
            for step in 0..500 {
                let edit = random_edit(&mut rng, director.working_solution());
                let score = director.apply(edit).unwrap();
                assert_eq!(
                    score,
                    director.calculate_score(),
                    "step {step} after {edit:?} ({trips} trips, {vehicles} vehicles)"
                );
            }
        }
    }

    #[test]
    fn test_incremental_matches_full_rescan() {
        check_incremental(&ScoringConfig::default(), 17);
    }

    #[test]
    fn test_incremental_matches_full_rescan_driving_time() {
        let config = ScoringConfig {
            travel_objective: TravelObjective::PenalizeDrivingTime,
        };
        check_incremental(&config, 29);
    }

    #[test]
    fn test_failed_edit_keeps_score() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = trip_plan(&mut rng, 3, 2);
        let mut director = ScoreDirector::new(plan);
        director
            .apply(Edit::Assign { visit: 0, vehicle: 0, position: 0 })
            .unwrap();
        let before = director.score();

        assert!(director
            .apply(Edit::Assign { visit: 0, vehicle: 1, position: 0 })
            .is_err());
        assert!(director.apply(Edit::Unassign { visit: 3 }).is_err());
        assert_eq!(director.score(), before);
        assert_eq!(director.working_solution().score(), Some(before));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut rng = StdRng::seed_from_u64(5);
        let plan = trip_plan(&mut rng, 2, 1);
        let mut director = ScoreDirector::new(plan);
        let snapshot = director.snapshot();

        director
            .apply(Edit::Assign { visit: 0, vehicle: 0, position: 0 })
            .unwrap();
        assert!(snapshot.visits()[0].vehicle().is_none());
        assert_eq!(snapshot.score(), Some(HardSoftScore::of_hard(-500)));
        assert_eq!(director.finish().visits()[0].vehicle(), Some(0));
    }

    #[test]
    fn test_finished_plan_edit_clears_score() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut director = ScoreDirector::new(trip_plan(&mut rng, 2, 1));
        let score = director
            .apply(Edit::Assign { visit: 0, vehicle: 0, position: 0 })
            .unwrap();

        let mut plan = director.finish();
        assert_eq!(plan.score(), Some(score));
        plan.apply(Edit::Unassign { visit: 0 }).unwrap();
        assert_eq!(plan.score(), None);
    }
}
