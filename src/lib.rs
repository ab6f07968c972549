//! Pickup and drop-off vehicle routing.
//!
//! The route model and scorer an optimizer drives: it proposes edits to a
//! [`RoutePlan`](domain::RoutePlan), the shadow engine keeps every derived
//! field consistent, and the [`ScoreDirector`](director::ScoreDirector)
//! keeps a hard/soft score in sync incrementally.
//!
//! # Domain Model
//!
//! - [`Location`](geometry::Location): point with straight-line driving time
//! - [`Visit`](domain::Visit): pickup or drop-off stop with time window and demand
//! - [`Vehicle`](domain::Vehicle): vehicle with capacity, type and route
//! - [`RoutePlan`](domain::RoutePlan): the arena holding both
//!
//! # Constraints
//!
//! - **Vehicle capacity** (hard): total demand must not exceed capacity
//! - **Pairing** (hard): pickup and drop-off share a vehicle, in order, back to back
//! - **Vehicle type** (hard): visits ride the vehicle type they need
//! - **Arrival window** (hard): arrivals inside the visit's window
//! - **Use more vehicles** (hard): no idle vehicle
//! - **Travel time** (soft): see [`TravelObjective`](constraints::TravelObjective)

pub mod console;
pub mod constraints;
pub mod converters;
pub mod director;
pub mod domain;
pub mod dto;
pub mod error;
pub mod geometry;
pub mod route;
pub mod score;
pub mod scoring;
pub mod session;
pub mod shadow;
