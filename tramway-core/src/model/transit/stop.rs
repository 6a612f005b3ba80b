use std::sync::Arc;

use geo::Point;
use hashbrown::HashMap;

use super::route::TransportRoute;
use super::types::TransportStopExit;
use crate::{DELETED_STOP, RouteId, StopId, geometry};

/// A public transport stop.
///
/// While loading, `references_to_routes` holds file-local route offsets and
/// `routes_ids` the matching global ids. Once the stop has been merged across
/// files the resolved routes live in `routes`.
#[derive(Debug, Clone)]
pub struct TransportStop {
    pub id: StopId,
    pub name: String,
    pub en_name: String,
    pub names: HashMap<String, String>,
    pub location: Point<f64>,
    pub x31: i32,
    pub y31: i32,
    pub references_to_routes: Vec<i32>,
    pub routes_ids: Vec<RouteId>,
    pub deleted_routes_ids: Vec<RouteId>,
    pub exits: Vec<TransportStopExit>,
    pub routes: Vec<Arc<TransportRoute>>,
    /// Placeholder for a known gap in a route fragment
    pub missing: bool,
}

impl TransportStop {
    pub fn new(id: StopId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            name: String::new(),
            en_name: String::new(),
            names: HashMap::new(),
            location: Point::new(lon, lat),
            x31: geometry::get_31_tile_number_x(lon),
            y31: geometry::get_31_tile_number_y(lat),
            references_to_routes: Vec::new(),
            routes_ids: Vec::new(),
            deleted_routes_ids: Vec::new(),
            exits: Vec::new(),
            routes: Vec::new(),
            missing: false,
        }
    }

    /// Gap marker used inside incomplete route fragments.
    pub fn missing_stop(lat: f64, lon: f64) -> Self {
        Self {
            missing: true,
            ..Self::new(-1, lat, lon)
        }
    }

    /// Stop carrying only the deletion marker.
    pub fn deleted(id: StopId, lat: f64, lon: f64) -> Self {
        Self {
            references_to_routes: vec![DELETED_STOP],
            ..Self::new(id, lat, lon)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lon(&self) -> f64 {
        self.location.x()
    }

    pub fn set_location31(&mut self, x31: i32, y31: i32) {
        self.x31 = x31;
        self.y31 = y31;
        self.location = Point::new(
            geometry::get_31_longitude_x(x31),
            geometry::get_31_latitude_y(y31),
        );
    }

    /// Places the stop at tile `(dx, dy)` of `zoom`.
    pub fn set_location(&mut self, zoom: u8, dx: i32, dy: i32) {
        self.set_location31(dx << (31 - zoom), dy << (31 - zoom));
    }

    pub fn distance_to(&self, other: &TransportStop) -> f64 {
        geometry::point_distance(self.location, other.location)
    }

    pub fn is_deleted(&self) -> bool {
        self.references_to_routes.len() == 1 && self.references_to_routes[0] == DELETED_STOP
    }

    pub fn is_missing_stop(&self) -> bool {
        self.missing
    }

    pub fn has_route(&self, route_id: RouteId) -> bool {
        self.routes_ids.contains(&route_id)
    }

    pub fn is_route_deleted(&self, route_id: RouteId) -> bool {
        self.deleted_routes_ids.contains(&route_id)
    }

    pub fn has_references_to_routes(&self) -> bool {
        !self.is_deleted() && !self.references_to_routes.is_empty()
    }

    pub fn add_deleted_route_id(&mut self, route_id: RouteId) {
        if !self.is_route_deleted(route_id) {
            self.deleted_routes_ids.push(route_id);
        }
    }

    /// Keeps `routes_ids` sorted and free of duplicates.
    pub fn add_route_id(&mut self, route_id: RouteId) {
        if let Err(pos) = self.routes_ids.binary_search(&route_id) {
            self.routes_ids.insert(pos, route_id);
        }
    }

    pub fn add_route(&mut self, route: Arc<TransportRoute>) {
        self.routes.push(route);
    }

    /// Drops loading bookkeeping; the deletion marker survives.
    pub fn clear_references_to_routes(&mut self) {
        if !self.is_deleted() {
            self.references_to_routes.clear();
        }
    }

    pub fn names_map(&self, include_en: bool) -> HashMap<String, String> {
        let mut names = self.names.clone();
        if include_en && !self.en_name.is_empty() {
            names.insert("en".to_string(), self.en_name.clone());
        }
        names
    }

    pub fn name_in(&self, lang: &str) -> Option<&str> {
        self.names.get(lang).map(String::as_str)
    }

    /// Content comparison used to check cached stops against freshly read ones.
    pub fn content_eq(&self, other: &TransportStop) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.id == other.id
            && self.location == other.location
            && self.name == other.name
            && self.names_map(true) == other.names_map(true)
            && self.exits.len() == other.exits.len()
            && self
                .exits
                .iter()
                .all(|exit| other.exits.iter().any(|e| exit.content_eq(e)))
    }
}
