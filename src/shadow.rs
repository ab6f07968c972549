//! Shadow variable propagation.
//!
//! After an edit the engine restores, in this order:
//!
//! 1. `vehicle`, `previous_visit`, `next_visit` for the edited visit and its
//!    old/new neighbours (O(1))
//! 2. the vehicle's cached demand and driving time (O(1) deltas)
//! 3. `arrival_time` by walking forward from the first stale position,
//!    stopping once a recomputed arrival matches the stored one past the
//!    last relinked position
//!
//! [`RoutePlan::update_shadows`] recomputes everything from scratch and is
//! the baseline the incremental path must agree with.

use crate::domain::RoutePlan;
use crate::geometry::{driving_time, Location};
use crate::route::{DirtySet, RouteTail};

impl RoutePlan {
    /// Recomputes every shadow variable and cached aggregate from the routes.
    ///
    /// # Examples
    ///
    /// ```
    /// use dial_a_ride::domain::{RoutePlan, Vehicle, Visit};
    /// use dial_a_ride::geometry::Location;
    ///
    /// let visits = vec![
    ///     Visit::new("a", "A", Location::new(0.0, 0.01)).with_demand(10),
    ///     Visit::new("b", "B", Location::new(0.0, 0.02)).with_demand(20),
    /// ];
    /// let vehicles = vec![Vehicle::new("v1", 100, Location::new(0.0, 0.0)).with_route(vec![0, 1])];
    ///
    /// let mut plan = RoutePlan::new("test", visits, vehicles).unwrap();
    /// plan.update_shadows();
    ///
    /// assert_eq!(plan.visits()[0].previous_visit(), None); // first in route
    /// assert_eq!(plan.visits()[1].previous_visit(), Some(0));
    /// assert_eq!(plan.vehicles()[0].total_demand(), 30);
    /// assert_eq!(plan.vehicles()[0].total_driving_time(), 40 + 40 + 80);
    /// ```
    pub fn update_shadows(&mut self) {
        for visit in &mut self.visits {
            visit.vehicle = None;
            visit.previous_visit = None;
            visit.next_visit = None;
            visit.arrival_time = None;
        }

        for vehicle_idx in 0..self.vehicles.len() {
            self.update_vehicle_shadows(vehicle_idx);
        }
    }

    /// Compares the stored shadow state against a full recomputation.
    ///
    /// Returns one line per disagreeing field; empty when consistent.
    pub fn shadow_mismatches(&self) -> Vec<String> {
        let mut expected = self.clone();
        expected.update_shadows();

        let mut mismatches = Vec::new();
        for (actual, expected) in self.visits.iter().zip(&expected.visits) {
            let fields = [
                ("vehicle", actual.vehicle.map(|v| v as i64), expected.vehicle.map(|v| v as i64)),
                (
                    "previous_visit",
                    actual.previous_visit.map(|v| v as i64),
                    expected.previous_visit.map(|v| v as i64),
                ),
                (
                    "next_visit",
                    actual.next_visit.map(|v| v as i64),
                    expected.next_visit.map(|v| v as i64),
                ),
                ("arrival_time", actual.arrival_time, expected.arrival_time),
            ];
            for (field, got, want) in fields {
                if got != want {
                    mismatches.push(format!(
                        "visit {}: {} is {:?}, expected {:?}",
                        actual.id, field, got, want
                    ));
                }
            }
        }
        for (actual, expected) in self.vehicles.iter().zip(&expected.vehicles) {
            if actual.cached_total_demand != expected.cached_total_demand {
                mismatches.push(format!(
                    "vehicle {}: total demand is {}, expected {}",
                    actual.id, actual.cached_total_demand, expected.cached_total_demand
                ));
            }
            if actual.cached_driving_time != expected.cached_driving_time {
                mismatches.push(format!(
                    "vehicle {}: driving time is {}, expected {}",
                    actual.id, actual.cached_driving_time, expected.cached_driving_time
                ));
            }
        }
        mismatches
    }

    /// Links a freshly inserted visit at `position` and its neighbours.
    pub(crate) fn after_insert(&mut self, vehicle: usize, position: usize, dirty: &mut DirtySet) {
        let route = &self.vehicles[vehicle].visits;
        let visit = route[position];
        let prev = position.checked_sub(1).map(|p| route[p]);
        let next = route.get(position + 1).copied();

        let inserted = &mut self.visits[visit];
        inserted.vehicle = Some(vehicle);
        inserted.previous_visit = prev;
        inserted.next_visit = next;
        dirty.mark_visit(visit);

        if let Some(p) = prev {
            self.visits[p].next_visit = Some(visit);
            dirty.mark_visit(p);
        }
        if let Some(n) = next {
            self.visits[n].previous_visit = Some(visit);
            dirty.mark_visit(n);
        }

        let detour = self.detour(vehicle, visit, prev, next);
        let demand = self.visits[visit].demand;
        let owner = &mut self.vehicles[vehicle];
        owner.cached_total_demand += demand;
        owner.cached_driving_time += detour;
        dirty.mark_vehicle(vehicle);
    }

    /// Clears a visit just taken out of `position` and closes the gap.
    pub(crate) fn after_remove(
        &mut self,
        visit: usize,
        vehicle: usize,
        position: usize,
        dirty: &mut DirtySet,
    ) {
        let route = &self.vehicles[vehicle].visits;
        let prev = position.checked_sub(1).map(|p| route[p]);
        let next = route.get(position).copied();

        if let Some(p) = prev {
            self.visits[p].next_visit = next;
            dirty.mark_visit(p);
        }
        if let Some(n) = next {
            self.visits[n].previous_visit = prev;
            dirty.mark_visit(n);
        }

        let removed = &mut self.visits[visit];
        removed.vehicle = None;
        removed.previous_visit = None;
        removed.next_visit = None;
        removed.arrival_time = None;
        dirty.mark_visit(visit);

        let detour = self.detour(vehicle, visit, prev, next);
        let demand = self.visits[visit].demand;
        let owner = &mut self.vehicles[vehicle];
        owner.cached_total_demand -= demand;
        owner.cached_driving_time -= detour;
        dirty.mark_vehicle(vehicle);
    }

    /// Walks `tail` forward recomputing arrival times.
    pub(crate) fn propagate(&mut self, tail: RouteTail, dirty: &mut DirtySet) {
        dirty.tails.push(tail);
        let len = self.vehicles[tail.vehicle].visits.len();

        for position in tail.start..len {
            let visit = self.vehicles[tail.vehicle].visits[position];
            let arrival = self.arrival_at(tail.vehicle, position);
            if self.visits[visit].arrival_time == arrival {
                if position >= tail.exit_floor {
                    break;
                }
                continue;
            }
            self.visits[visit].arrival_time = arrival;
            dirty.mark_visit(visit);
        }
    }

    /// Arrival time at `position` given the stored state of its predecessor.
    fn arrival_at(&self, vehicle: usize, position: usize) -> Option<i64> {
        let owner = &self.vehicles[vehicle];
        let visit = &self.visits[owner.visits[position]];
        match position.checked_sub(1) {
            None => Some(
                owner.departure_time + driving_time(&owner.home_location, &visit.location),
            ),
            Some(prev_position) => {
                let prev = &self.visits[owner.visits[prev_position]];
                prev.departure_time()
                    .map(|departure| departure + driving_time(&prev.location, &visit.location))
            }
        }
    }

    /// Extra driving caused by going `prev -> visit -> next` instead of `prev -> next`.
    fn detour(&self, vehicle: usize, visit: usize, prev: Option<usize>, next: Option<usize>) -> i64 {
        let home = self.vehicles[vehicle].home_location;
        let stop = |idx: Option<usize>| -> Location { idx.map_or(home, |i| self.visits[i].location) };
        let (from, to) = (stop(prev), stop(next));
        let at = self.visits[visit].location;
        driving_time(&from, &at) + driving_time(&at, &to) - driving_time(&from, &to)
    }

    /// Recomputes shadows and caches for one route from scratch.
    fn update_vehicle_shadows(&mut self, vehicle_idx: usize) {
        let route = std::mem::take(&mut self.vehicles[vehicle_idx].visits);
        let home = self.vehicles[vehicle_idx].home_location;

        let mut prev_departure = Some(self.vehicles[vehicle_idx].departure_time);
        let mut prev_location = home;
        let mut prev_visit: Option<usize> = None;
        let mut total_demand = 0;
        let mut driving = 0;

        for (position, &visit_idx) in route.iter().enumerate() {
            let visit = &mut self.visits[visit_idx];
            let travel = driving_time(&prev_location, &visit.location);

            visit.vehicle = Some(vehicle_idx);
            visit.previous_visit = prev_visit;
            visit.next_visit = route.get(position + 1).copied();
            visit.arrival_time = prev_departure.map(|departure| departure + travel);

            total_demand += visit.demand;
            driving += travel;
            prev_departure = visit.departure_time();
            prev_location = visit.location;
            prev_visit = Some(visit_idx);
        }

        if !route.is_empty() {
            driving += driving_time(&prev_location, &home);
        }

        let vehicle = &mut self.vehicles[vehicle_idx];
        vehicle.visits = route;
        vehicle.cached_total_demand = total_demand;
        vehicle.cached_driving_time = driving;
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{RoutePlan, Vehicle, Visit};
    use crate::geometry::Location;
    use crate::route::Edit;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Visits spread on a line east of the depot, 40s apart.
    fn line_plan(n_visits: usize, n_vehicles: usize) -> RoutePlan {
        let visits = (0..n_visits)
            .map(|i| {
                Visit::new(format!("v{i}"), "", Location::new(0.0, 0.01 * (i + 1) as f64))
                    .with_service_duration(30)
            })
            .collect();
        let vehicles = (0..n_vehicles)
            .map(|i| Vehicle::new(format!("car{i}"), 100, Location::new(0.0, 0.0)))
            .collect();
        RoutePlan::new("line", visits, vehicles).unwrap()
    }

    fn random_plan(rng: &mut StdRng, n_visits: usize, n_vehicles: usize) -> RoutePlan {
        let visits = (0..n_visits)
            .map(|i| {
                let min_start = rng.gen_range(8 * 3600..12 * 3600);
                Visit::new(
                    format!("v{i}"),
                    "",
                    Location::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)),
                )
                .with_demand(rng.gen_range(-3..=3))
                .with_time_window(min_start, min_start + rng.gen_range(600..7200))
                .with_service_duration(rng.gen_range(0..600))
            })
            .collect();
        let vehicles = (0..n_vehicles)
            .map(|i| {
                Vehicle::new(format!("car{i}"), 10, Location::new(0.0, 0.0))
                    .with_departure_time(rng.gen_range(6 * 3600..9 * 3600))
            })
            .collect();
        RoutePlan::new("random", visits, vehicles).unwrap()
    }

    fn random_edit(rng: &mut StdRng, plan: &RoutePlan) -> Edit {
        let visit = rng.gen_range(0..plan.visits().len());
        let vehicle = rng.gen_range(0..plan.vehicles().len());
        let len = plan.vehicles()[vehicle].route().len();
        match (plan.visits()[visit].vehicle(), rng.gen_range(0..3)) {
            (None, _) => Edit::Assign {
                visit,
                vehicle,
                position: rng.gen_range(0..=len),
            },
            (Some(_), 0) => Edit::Unassign { visit },
            (Some(source), _) => {
                let len = len - usize::from(source == vehicle);
                Edit::Move {
                    visit,
                    vehicle,
                    position: rng.gen_range(0..=len),
                }
            }
        }
    }

    #[test]
    fn test_insert_at_front_shifts_arrivals() {
        let mut plan = line_plan(3, 1);
        plan.assign(1, 0, 0).unwrap();
        plan.assign(2, 0, 1).unwrap();
        let before = plan.visits()[2].arrival_time().unwrap();

        plan.assign(0, 0, 0).unwrap();
        // Detour via v0 costs nothing on a line, but its service time does.
        assert_eq!(plan.visits()[2].arrival_time(), Some(before + 30));
        assert!(plan.shadow_mismatches().is_empty());
    }

    #[test]
    fn test_walk_stops_when_arrival_unchanged() {
        let mut plan = line_plan(4, 1);
        for i in 0..3 {
            plan.assign(i, 0, i).unwrap();
        }
        // v1 and v2 have late windows, so a change before v1 is absorbed by waiting.
        let visits = &mut plan.visits;
        visits[1].min_start_time = 12 * 3600;
        visits[2].min_start_time = 12 * 3600;
        plan.update_shadows();

        let dirty = plan.unassign(0).unwrap();
        // v1 arrives earlier, but departs at the same time: v2 untouched.
        assert!(dirty.visits.contains(&1));
        assert!(!dirty.visits.contains(&2));
        assert!(plan.shadow_mismatches().is_empty());
    }

    #[test]
    fn test_unassign_round_trip_restores_others() {
        let mut plan = line_plan(5, 2);
        plan.assign(0, 0, 0).unwrap();
        plan.assign(1, 0, 1).unwrap();
        plan.assign(2, 1, 0).unwrap();
        plan.assign(3, 0, 2).unwrap();
        let before = plan.clone();

        plan.assign(4, 0, 1).unwrap();
        plan.unassign(4).unwrap();

        let visit = &plan.visits()[4];
        assert_eq!(visit.vehicle(), None);
        assert_eq!(visit.previous_visit(), None);
        assert_eq!(visit.next_visit(), None);
        assert_eq!(visit.arrival_time(), None);
        assert_eq!(plan.visits(), before.visits());
        assert_eq!(plan.vehicles(), before.vehicles());
    }

    #[test]
    fn test_route_emptied() {
        let mut plan = line_plan(1, 1);
        plan.assign(0, 0, 0).unwrap();
        plan.unassign(0).unwrap();
        assert_eq!(plan.vehicles()[0].total_driving_time(), 0);
        assert_eq!(plan.vehicles()[0].total_demand(), 0);
        assert!(plan.shadow_mismatches().is_empty());
    }

    #[test]
    fn test_move_to_same_position_is_stable() {
        let mut plan = line_plan(3, 1);
        for i in 0..3 {
            plan.assign(i, 0, i).unwrap();
        }
        let before = plan.clone();
        plan.move_visit(1, 0, 1).unwrap();
        assert_eq!(plan.visits(), before.visits());
    }

    #[test]
    fn test_random_edits_match_full_rescan() {
        let mut rng = StdRng::seed_from_u64(7);
        for (n_visits, n_vehicles) in [(2, 1), (6, 2), (30, 5), (200, 50)] {
            let mut plan = random_plan(&mut rng, n_visits, n_vehicles);
            for _ in 0..1000 {
                let edit = random_edit(&mut rng, &plan);
                plan.apply(edit).unwrap();
                let mismatches = plan.shadow_mismatches();
                assert!(mismatches.is_empty(), "after {edit:?}: {mismatches:?}");
            }
        }
    }

    #[test]
    fn test_many_short_sequences_match_full_rescan() {
        let sizes = [(2, 1), (6, 2), (30, 5), (200, 50)];
        for seed in 0..1200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (n_visits, n_vehicles) = sizes[seed as usize % sizes.len()];
            let mut plan = random_plan(&mut rng, n_visits, n_vehicles);
            for _ in 0..40 {
                let edit = random_edit(&mut rng, &plan);
                plan.apply(edit).unwrap();
                let mismatches = plan.shadow_mismatches();
                assert!(mismatches.is_empty(), "seed {seed} after {edit:?}: {mismatches:?}");
            }
        }
    }

    #[test]
    fn test_failed_edit_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut plan = random_plan(&mut rng, 10, 2);
        for i in 0..5 {
            plan.assign(i, 0, i).unwrap();
        }
        let before = plan.clone();

        assert!(plan.move_visit(0, 1, 3).is_err());
        assert!(plan.assign(2, 1, 0).is_err());
        assert!(plan.unassign(7).is_err());
        assert_eq!(plan.visits(), before.visits());
        assert_eq!(plan.vehicles(), before.vehicles());
    }
}
