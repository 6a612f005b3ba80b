#![allow(dead_code)]

use std::sync::Arc;

use geo::Point;
use tramway_core::prelude::*;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `(lat, lon)` as a point.
pub fn point(lat: f64, lon: f64) -> Point<f64> {
    Point::new(lon, lat)
}

pub fn stop(id: StopId, lat: f64, lon: f64) -> TransportStop {
    TransportStop::new(id, lat, lon).with_name(format!("S{id}"))
}

/// Builds a route over `(stop id, lat, lon)` triples.
pub fn route(id: RouteId, route_type: &str, stops: &[(StopId, f64, f64)]) -> TransportRoute {
    let mut route = TransportRoute::new(id, route_type);
    route.reference = id.to_string();
    route.forward_stops = stops
        .iter()
        .map(|&(sid, lat, lon)| stop(sid, lat, lon))
        .collect();
    route
}

pub fn config() -> TransportRoutingConfiguration {
    TransportRoutingConfiguration::default()
}

pub fn plan(
    files: &[&dyn TransportIndex],
    cfg: TransportRoutingConfiguration,
    start: Point<f64>,
    end: Point<f64>,
) -> Result<Vec<TransportRouteResult>, Error> {
    let mut ctx = TransportRoutingContext::new(Arc::new(cfg), files)?;
    build_transport_route(&mut ctx, start, end)
}

pub fn route_ids(result: &TransportRouteResult) -> Vec<RouteId> {
    result.route_ids().collect()
}

/// Walking time between two points at the configured walk speed.
pub fn walk_time(cfg: &TransportRoutingConfiguration, a: Point<f64>, b: Point<f64>) -> f64 {
    tramway_core::geometry::point_distance(a, b) / cfg.walk_speed
}

/// Riding time over consecutive stops without a schedule.
pub fn ride_time(cfg: &TransportRoutingConfiguration, route: &TransportRoute) -> f64 {
    let speed = cfg.speed_by_route_type(&route.route_type);
    route
        .forward_stops
        .windows(2)
        .map(|w| cfg.stop_time + w[0].distance_to(&w[1]) / speed)
        .sum()
}

/// A bus along the equator and a slower tram that branches off at its
/// middle stop, plus a tram running from next to the start to next to the
/// end:
///
/// ```text
///   bus 1:   S0 (0.0) -- M (0.02) -- E (0.04)
///   tram 2:              M (0.02) -- E2 (0.0405)
///   tram 3:  P0 (0.001, 0.0) ------- P1 (0.001, 0.0402)
/// ```
pub fn branching_network() -> MemoryTransportIndex {
    MemoryTransportIndex::from_routes(
        "branching",
        vec![
            route(1, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.02), (3, 0.0, 0.04)]),
            route(2, "tram", &[(2, 0.0, 0.02), (4, 0.0, 0.0405)]),
            route(3, "tram", &[(5, 0.001, 0.0), (6, 0.001, 0.0402)]),
        ],
    )
}

pub const BRANCHING_START: (f64, f64) = (0.0, -0.001);
pub const BRANCHING_END: (f64, f64) = (0.0, 0.0402);
