//! Constraint streams and constraint sets.
//!
//! A constraint is a filter plus a weighted magnitude over one entity kind
//! (vehicles or visits). Each constraint contributes per entity, so a score
//! can be kept up to date by re-evaluating only the entities an edit
//! touched. Contributions are summed, so evaluation order does not matter.
//!
//! ```
//! use dial_a_ride::scoring::{ConstraintSet, ConstraintStream};
//! use dial_a_ride::score::HardSoftScore;
//!
//! let capacity = ConstraintStream::for_each_vehicle()
//!     .filter(|plan, v| plan.vehicles()[v].excess_demand() > 0)
//!     .penalize_with(HardSoftScore::ONE_HARD, |plan, v| {
//!         plan.vehicles()[v].excess_demand() as i64
//!     })
//!     .as_constraint("vehicleCapacity");
//!
//! let constraints = ConstraintSet::new(vec![capacity]);
//! assert_eq!(constraints.len(), 1);
//! ```

use rayon::prelude::*;

use crate::domain::RoutePlan;
use crate::score::HardSoftScore;

type Predicate = Box<dyn Fn(&RoutePlan, usize) -> bool + Send + Sync>;
type Magnitude = Box<dyn Fn(&RoutePlan, usize) -> i64 + Send + Sync>;

/// Entity kind a constraint iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintTarget {
    Vehicles,
    Visits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactType {
    Penalty,
    Reward,
}

/// Start of a constraint definition: the entities to iterate and the filters.
pub struct ConstraintStream {
    target: ConstraintTarget,
    filters: Vec<Predicate>,
}

impl ConstraintStream {
    /// Iterates every vehicle.
    pub fn for_each_vehicle() -> Self {
        Self {
            target: ConstraintTarget::Vehicles,
            filters: Vec::new(),
        }
    }

    /// Iterates every visit, assigned or not.
    pub fn for_each_visit() -> Self {
        Self {
            target: ConstraintTarget::Visits,
            filters: Vec::new(),
        }
    }

    /// Keeps only entities matching `predicate`. Filters are combined with AND.
    pub fn filter(mut self, predicate: impl Fn(&RoutePlan, usize) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Penalizes each match by `weight`.
    pub fn penalize(self, weight: HardSoftScore) -> ScoredStream {
        self.penalize_with(weight, |_, _| 1)
    }

    /// Penalizes each match by `weight * magnitude(match)`.
    pub fn penalize_with(
        self,
        weight: HardSoftScore,
        magnitude: impl Fn(&RoutePlan, usize) -> i64 + Send + Sync + 'static,
    ) -> ScoredStream {
        self.scored(ImpactType::Penalty, weight, Box::new(magnitude))
    }

    /// Rewards each match by `weight * magnitude(match)`.
    pub fn reward_with(
        self,
        weight: HardSoftScore,
        magnitude: impl Fn(&RoutePlan, usize) -> i64 + Send + Sync + 'static,
    ) -> ScoredStream {
        self.scored(ImpactType::Reward, weight, Box::new(magnitude))
    }

    fn scored(self, impact_type: ImpactType, weight: HardSoftScore, magnitude: Magnitude) -> ScoredStream {
        ScoredStream {
            stream: self,
            impact_type,
            weight,
            magnitude,
        }
    }
}

/// A stream with its impact attached, waiting for a name.
pub struct ScoredStream {
    stream: ConstraintStream,
    impact_type: ImpactType,
    weight: HardSoftScore,
    magnitude: Magnitude,
}

impl ScoredStream {
    pub fn as_constraint(self, name: &'static str) -> Constraint {
        Constraint {
            name,
            target: self.stream.target,
            filters: self.stream.filters,
            impact_type: self.impact_type,
            weight: self.weight,
            magnitude: self.magnitude,
        }
    }
}

/// One match of a constraint, for score explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintMatch {
    pub target: ConstraintTarget,
    /// Index of the matched entity.
    pub index: usize,
    /// Id of the matched entity.
    pub entity_id: String,
    pub score: HardSoftScore,
}

/// Breakdown of one constraint's contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintAnalysis {
    pub name: &'static str,
    pub weight: HardSoftScore,
    pub score: HardSoftScore,
    pub matches: Vec<ConstraintMatch>,
}

/// A named, weighted rule over one entity kind.
pub struct Constraint {
    name: &'static str,
    target: ConstraintTarget,
    filters: Vec<Predicate>,
    impact_type: ImpactType,
    weight: HardSoftScore,
    magnitude: Magnitude,
}

impl Constraint {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn target(&self) -> ConstraintTarget {
        self.target
    }

    #[inline]
    pub fn impact_type(&self) -> ImpactType {
        self.impact_type
    }

    /// Signed score of a single match with magnitude 1.
    pub fn weight(&self) -> HardSoftScore {
        match self.impact_type {
            ImpactType::Penalty => -self.weight,
            ImpactType::Reward => self.weight,
        }
    }

    /// Returns true if entity `idx` is matched.
    pub fn is_match(&self, plan: &RoutePlan, idx: usize) -> bool {
        self.filters.iter().all(|filter| filter(plan, idx))
    }

    /// Contribution of entity `idx`; zero when unmatched.
    pub fn impact(&self, plan: &RoutePlan, idx: usize) -> HardSoftScore {
        if self.is_match(plan, idx) {
            self.weight().multiply((self.magnitude)(plan, idx))
        } else {
            HardSoftScore::ZERO
        }
    }

    /// Full rescan over every entity of the target kind.
    pub fn evaluate(&self, plan: &RoutePlan) -> HardSoftScore {
        (0..entity_count(plan, self.target))
            .map(|idx| self.impact(plan, idx))
            .sum()
    }

    /// Matches with their individual contributions.
    pub fn analyze(&self, plan: &RoutePlan) -> ConstraintAnalysis {
        let matches: Vec<ConstraintMatch> = (0..entity_count(plan, self.target))
            .filter(|&idx| self.is_match(plan, idx))
            .map(|idx| ConstraintMatch {
                target: self.target,
                index: idx,
                entity_id: entity_id(plan, self.target, idx).to_string(),
                score: self.weight().multiply((self.magnitude)(plan, idx)),
            })
            .collect();

        ConstraintAnalysis {
            name: self.name,
            weight: self.weight(),
            score: matches.iter().map(|m| m.score).sum(),
            matches,
        }
    }
}

/// A flat list of independent constraints.
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Full rescan of every constraint, evaluated in parallel.
    pub fn evaluate_all(&self, plan: &RoutePlan) -> HardSoftScore {
        self.constraints
            .par_iter()
            .map(|constraint| constraint.evaluate(plan))
            .reduce(|| HardSoftScore::ZERO, |a, b| a + b)
    }

    /// Sum of all vehicle-level contributions of vehicle `idx`.
    pub fn vehicle_impact(&self, plan: &RoutePlan, idx: usize) -> HardSoftScore {
        self.impact_for(plan, ConstraintTarget::Vehicles, idx)
    }

    /// Sum of all visit-level contributions of visit `idx`.
    pub fn visit_impact(&self, plan: &RoutePlan, idx: usize) -> HardSoftScore {
        self.impact_for(plan, ConstraintTarget::Visits, idx)
    }

    /// Per-constraint breakdown in definition order.
    pub fn analyze(&self, plan: &RoutePlan) -> Vec<ConstraintAnalysis> {
        self.constraints.iter().map(|c| c.analyze(plan)).collect()
    }

    fn impact_for(&self, plan: &RoutePlan, target: ConstraintTarget, idx: usize) -> HardSoftScore {
        self.constraints
            .iter()
            .filter(|c| c.target == target)
            .map(|c| c.impact(plan, idx))
            .sum()
    }
}

fn entity_count(plan: &RoutePlan, target: ConstraintTarget) -> usize {
    match target {
        ConstraintTarget::Vehicles => plan.vehicles().len(),
        ConstraintTarget::Visits => plan.visits().len(),
    }
}

fn entity_id(plan: &RoutePlan, target: ConstraintTarget, idx: usize) -> &str {
    match target {
        ConstraintTarget::Vehicles => &plan.vehicles()[idx].id,
        ConstraintTarget::Visits => &plan.visits()[idx].id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Vehicle, Visit};
    use crate::geometry::Location;

    fn plan() -> RoutePlan {
        let visits = vec![
            Visit::new("a", "A", Location::new(0.0, 0.01)).with_demand(3),
            Visit::new("b", "B", Location::new(0.0, 0.02)).with_demand(4),
            Visit::new("c", "C", Location::new(0.0, 0.03)).with_demand(5),
        ];
        let vehicles = vec![
            Vehicle::new("full", 5, Location::new(0.0, 0.0)).with_route(vec![0, 1]),
            Vehicle::new("empty", 5, Location::new(0.0, 0.0)),
        ];
        RoutePlan::new("t", visits, vehicles).unwrap()
    }

    #[test]
    fn test_penalty_and_reward_signs() {
        let plan = plan();
        let penalty = ConstraintStream::for_each_visit()
            .penalize(HardSoftScore::ONE_HARD)
            .as_constraint("every");
        let reward = ConstraintStream::for_each_visit()
            .reward_with(HardSoftScore::ONE_SOFT, |plan, v| plan.visits()[v].demand as i64)
            .as_constraint("demand");

        assert_eq!(penalty.evaluate(&plan), HardSoftScore::of_hard(-3));
        assert_eq!(reward.evaluate(&plan), HardSoftScore::of_soft(12));
        assert_eq!(penalty.weight(), HardSoftScore::of_hard(-1));
    }

    #[test]
    fn test_filters_combine() {
        let plan = plan();
        let constraint = ConstraintStream::for_each_visit()
            .filter(|plan, v| plan.visits()[v].is_assigned())
            .filter(|plan, v| plan.visits()[v].demand > 3)
            .penalize(HardSoftScore::ONE_HARD)
            .as_constraint("assignedHeavy");

        assert!(!constraint.is_match(&plan, 0));
        assert!(constraint.is_match(&plan, 1));
        assert!(!constraint.is_match(&plan, 2));
    }

    #[test]
    fn test_entity_impacts_sum_to_total() {
        let plan = plan();
        let set = ConstraintSet::new(vec![
            ConstraintStream::for_each_vehicle()
                .filter(|plan, v| plan.vehicles()[v].excess_demand() > 0)
                .penalize_with(HardSoftScore::ONE_HARD, |plan, v| {
                    plan.vehicles()[v].excess_demand() as i64
                })
                .as_constraint("capacity"),
            ConstraintStream::for_each_visit()
                .filter(|plan, v| !plan.visits()[v].is_assigned())
                .penalize(HardSoftScore::ONE_SOFT)
                .as_constraint("unassigned"),
        ]);

        let by_entity: HardSoftScore = (0..2)
            .map(|v| set.vehicle_impact(&plan, v))
            .chain((0..3).map(|v| set.visit_impact(&plan, v)))
            .sum();
        assert_eq!(set.evaluate_all(&plan), HardSoftScore::of(-2, -1));
        assert_eq!(by_entity, set.evaluate_all(&plan));
    }

    #[test]
    fn test_analysis_lists_matches() {
        let plan = plan();
        let constraint = ConstraintStream::for_each_vehicle()
            .filter(|plan, v| plan.vehicles()[v].route().is_empty())
            .penalize(HardSoftScore::of_hard(500))
            .as_constraint("idle");

        let analysis = constraint.analyze(&plan);
        assert_eq!(analysis.name, "idle");
        assert_eq!(analysis.score, HardSoftScore::of_hard(-500));
        assert_eq!(analysis.matches.len(), 1);
        assert_eq!(analysis.matches[0].entity_id, "empty");
        assert_eq!(analysis.matches[0].index, 1);
    }
}
