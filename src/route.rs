//! Edit primitives: the only way a route plan's structure changes.
//!
//! Each primitive validates first and mutates second, so a failed edit leaves
//! the plan exactly as it was. After the sequence change the shadow engine
//! restores every derived field before the primitive returns.

use std::collections::BTreeSet;

use tracing::trace;

use crate::domain::RoutePlan;
use crate::error::PlanError;

/// A structural edit, addressed by arena indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Inserts an unassigned visit into a route at `position` (0..=len).
    Assign {
        visit: usize,
        vehicle: usize,
        position: usize,
    },
    /// Removes a visit from its route.
    Unassign { visit: usize },
    /// Unassign followed by assign, applied atomically. `position` is
    /// counted after the visit has been taken out of its old route.
    Move {
        visit: usize,
        vehicle: usize,
        position: usize,
    },
}

/// The part of a route whose arrival times may be stale after an edit.
///
/// Positions from `start` onward may have changed. The arrival walk may stop
/// at the first position `>= exit_floor` whose recomputed arrival equals the
/// stored one: from there on every visit has the predecessor it had when its
/// arrival was last computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTail {
    pub vehicle: usize,
    pub start: usize,
    pub exit_floor: usize,
}

/// What an edit touched.
///
/// `tails` is the region that may have changed; `visits` are the visits whose
/// shadow fields actually changed once propagation finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub vehicles: BTreeSet<usize>,
    pub visits: BTreeSet<usize>,
    pub tails: Vec<RouteTail>,
}

impl DirtySet {
    #[inline]
    pub(crate) fn mark_visit(&mut self, visit: usize) {
        self.visits.insert(visit);
    }

    #[inline]
    pub(crate) fn mark_vehicle(&mut self, vehicle: usize) {
        self.vehicles.insert(vehicle);
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.visits.is_empty()
    }
}

impl RoutePlan {
    /// Applies any [`Edit`].
    pub fn apply(&mut self, edit: Edit) -> Result<DirtySet, PlanError> {
        match edit {
            Edit::Assign {
                visit,
                vehicle,
                position,
            } => self.assign(visit, vehicle, position),
            Edit::Unassign { visit } => self.unassign(visit),
            Edit::Move {
                visit,
                vehicle,
                position,
            } => self.move_visit(visit, vehicle, position),
        }
    }

    /// Inserts `visit` into `vehicle`'s route at `position`.
    ///
    /// # Errors
    ///
    /// [`PlanError::AlreadyAssigned`] if the visit is on a route,
    /// [`PlanError::InvalidPosition`] if `position > route length`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dial_a_ride::domain::{RoutePlan, Vehicle, Visit};
    /// use dial_a_ride::geometry::Location;
    ///
    /// let visits = vec![Visit::new("a", "A", Location::new(0.0, 0.01))];
    /// let vehicles = vec![Vehicle::new("v1", 4, Location::new(0.0, 0.0))];
    /// let mut plan = RoutePlan::new("demo", visits, vehicles).unwrap();
    ///
    /// let dirty = plan.assign(0, 0, 0).unwrap();
    /// assert!(dirty.visits.contains(&0));
    /// assert_eq!(plan.visits()[0].vehicle(), Some(0));
    /// assert!(plan.assign(0, 0, 0).is_err());
    /// ```
    pub fn assign(
        &mut self,
        visit: usize,
        vehicle: usize,
        position: usize,
    ) -> Result<DirtySet, PlanError> {
        self.check_vehicle(vehicle)?;
        if self.check_visit(visit)?.is_some() {
            return Err(PlanError::AlreadyAssigned(self.visits[visit].id.clone()));
        }
        self.check_position(vehicle, position, self.vehicles[vehicle].visits.len())?;

        trace!(visit, vehicle, position, "assign");
        let mut dirty = DirtySet::default();
        self.vehicles[vehicle].visits.insert(position, visit);
        self.after_insert(vehicle, position, &mut dirty);
        self.propagate(
            RouteTail {
                vehicle,
                start: position,
                exit_floor: position + 1,
            },
            &mut dirty,
        );
        self.score = None;
        Ok(dirty)
    }

    /// Removes `visit` from its route.
    ///
    /// # Errors
    ///
    /// [`PlanError::NotAssigned`] if the visit is on no route.
    pub fn unassign(&mut self, visit: usize) -> Result<DirtySet, PlanError> {
        let Some(vehicle) = self.check_visit(visit)? else {
            return Err(PlanError::NotAssigned(self.visits[visit].id.clone()));
        };

        trace!(visit, vehicle, "unassign");
        let mut dirty = DirtySet::default();
        let position = self.detach(visit, vehicle, &mut dirty);
        self.propagate(
            RouteTail {
                vehicle,
                start: position,
                exit_floor: position,
            },
            &mut dirty,
        );
        self.score = None;
        Ok(dirty)
    }

    /// Moves an assigned `visit` to `position` in `vehicle`'s route.
    ///
    /// For a move within the same route, `position` ranges over the route
    /// without the moved visit.
    ///
    /// # Errors
    ///
    /// [`PlanError::NotAssigned`] if the visit is on no route,
    /// [`PlanError::InvalidPosition`] if the target position is out of range.
    pub fn move_visit(
        &mut self,
        visit: usize,
        vehicle: usize,
        position: usize,
    ) -> Result<DirtySet, PlanError> {
        self.check_vehicle(vehicle)?;
        let Some(source) = self.check_visit(visit)? else {
            return Err(PlanError::NotAssigned(self.visits[visit].id.clone()));
        };
        let target_len = self.vehicles[vehicle].visits.len() - usize::from(source == vehicle);
        self.check_position(vehicle, position, target_len)?;

        trace!(visit, from = source, to = vehicle, position, "move");
        let mut dirty = DirtySet::default();
        let old_position = self.detach(visit, source, &mut dirty);
        self.vehicles[vehicle].visits.insert(position, visit);
        self.after_insert(vehicle, position, &mut dirty);

        if source == vehicle {
            // One walk covers both the gap and the insertion point.
            self.propagate(
                RouteTail {
                    vehicle,
                    start: old_position.min(position),
                    exit_floor: old_position.max(position) + 1,
                },
                &mut dirty,
            );
        } else {
            self.propagate(
                RouteTail {
                    vehicle: source,
                    start: old_position,
                    exit_floor: old_position,
                },
                &mut dirty,
            );
            self.propagate(
                RouteTail {
                    vehicle,
                    start: position,
                    exit_floor: position + 1,
                },
                &mut dirty,
            );
        }
        self.score = None;
        Ok(dirty)
    }

    /// Takes `visit` out of `vehicle`'s route and relinks the gap.
    fn detach(&mut self, visit: usize, vehicle: usize, dirty: &mut DirtySet) -> usize {
        let route = &mut self.vehicles[vehicle].visits;
        // Shadow invariant: a visit whose vehicle shadow is set is on that route.
        let position = route
            .iter()
            .position(|&v| v == visit)
            .unwrap_or(route.len());
        route.remove(position);
        self.after_remove(visit, vehicle, position, dirty);
        position
    }

    /// Returns the visit's current vehicle.
    fn check_visit(&self, visit: usize) -> Result<Option<usize>, PlanError> {
        self.visits
            .get(visit)
            .map(|v| v.vehicle)
            .ok_or_else(|| PlanError::UnknownVisit(visit.to_string()))
    }

    fn check_vehicle(&self, vehicle: usize) -> Result<(), PlanError> {
        if vehicle < self.vehicles.len() {
            Ok(())
        } else {
            Err(PlanError::UnknownVehicle(vehicle.to_string()))
        }
    }

    fn check_position(&self, vehicle: usize, position: usize, len: usize) -> Result<(), PlanError> {
        if position <= len {
            Ok(())
        } else {
            Err(PlanError::InvalidPosition {
                vehicle: self.vehicles[vehicle].id.clone(),
                position,
                len,
            })
        }
    }
}
