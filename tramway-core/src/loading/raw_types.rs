use serde::{Deserialize, Serialize};

use crate::model::TransportSchedule;
use crate::{RouteId, StopId};

/// One map data file serialized as JSON.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexDocument {
    pub name: String,
    pub stops: Vec<StopRecord>,
    pub routes: Vec<RouteRecord>,
    pub incomplete_routes: Vec<IncompleteRouteRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StopRecord {
    pub id: StopId,
    pub name: String,
    pub en_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Offsets of the routes calling at the stop, in this file
    pub references_to_routes: Vec<i32>,
    /// Route ids matching `references_to_routes` position by position
    pub routes_ids: Vec<RouteId>,
    pub deleted_routes_ids: Vec<RouteId>,
    /// The stop was removed by this file
    pub deleted: bool,
    pub exits: Vec<ExitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExitRecord {
    pub reference: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RouteRecord {
    pub offset: u32,
    pub id: RouteId,
    pub route_type: String,
    pub reference: String,
    pub name: String,
    pub operator: String,
    pub color: Option<String>,
    pub dist: Option<u32>,
    pub incomplete: bool,
    pub stops: Vec<RouteStopRecord>,
    pub ways: Vec<WayRecord>,
    pub schedule: Option<TransportSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RouteStopRecord {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Gap placeholder inside an incomplete fragment
    pub missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WayRecord {
    pub id: i64,
    /// `[lat, lon]` pairs
    pub nodes: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IncompleteRouteRecord {
    pub route_id: RouteId,
    pub offsets: Vec<u32>,
}
