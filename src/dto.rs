//! Wire records for plans and score analysis.
//!
//! Entities reference each other by id only. Fields computed from the route
//! (arrival times, totals, score) are written on output and ignored on input.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geometry::Location;
use crate::session::SolverStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub location: Location,
    pub demand: i32,
    pub min_start_time: NaiveDateTime,
    pub max_end_time: NaiveDateTime,
    /// Seconds.
    pub service_duration: i64,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub is_pickup: bool,
    /// Only checked against `is_pickup` on load. A drop-off is a non-pickup
    /// with a `paired_visit_id`, so an unpaired visit is written back with
    /// `isDropoff: false`.
    #[serde(default)]
    pub is_dropoff: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_visit_id: Option<String>,

    // Computed from the routes on output.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub vehicle_name: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub previous_visit: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub next_visit: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<NaiveDateTime>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub start_service_time: Option<NaiveDateTime>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<NaiveDateTime>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub driving_time_seconds_from_previous_standstill: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: String,
    pub capacity: i32,
    pub home_location: Location,
    pub departure_time: NaiveDateTime,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub make_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Visit ids in driving order.
    #[serde(default)]
    pub visits: Vec<String>,

    #[serde(default, skip_deserializing)]
    pub total_demand: i32,
    #[serde(default, skip_deserializing)]
    pub total_driving_time_seconds: i64,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanDto {
    pub name: String,
    /// Recomputed from the locations on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south_west_corner: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north_east_corner: Option<Location>,
    pub vehicles: Vec<VehicleDto>,
    pub visits: Vec<VisitDto>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub solver_status: Option<SolverStatus>,
    #[serde(default, skip_deserializing)]
    pub total_driving_time_seconds: i64,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<NaiveDateTime>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintMatchDto {
    pub score: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintAnalysisDto {
    pub name: String,
    pub weight: String,
    pub score: String,
    pub matches: Vec<ConstraintMatchDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub score: String,
    pub constraints: Vec<ConstraintAnalysisDto>,
}
