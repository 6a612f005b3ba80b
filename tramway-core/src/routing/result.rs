use std::fmt;
use std::sync::Arc;

use geo::coord;

use super::config::TransportRoutingConfiguration;
use crate::model::{TransportRoute, TransportStop, Way};
use crate::{RouteId, ScheduleTime, Seconds, geometry};

/// Id of a way cut from the route geometry.
pub const GEOMETRY_WAY_ID: i64 = -1;
/// Id of a way drawn straight through the stops.
pub const STOPS_WAY_ID: i64 = -2;
/// Geometry nodes farther than this (meters) from a ride's end stops are not used.
const GEOMETRY_STOP_THRESHOLD: f64 = 150.0;

/// One ride of an itinerary: `route` from stop `start` to stop `end`.
#[derive(Debug, Clone)]
pub struct TransportRouteResultSegment {
    pub route: Arc<TransportRoute>,
    pub start: usize,
    pub end: usize,
    /// Walk to the boarding stop
    pub walk_dist: f64,
    pub walk_time: Seconds,
    /// Scheduled departure in ticks, `-1` when unscheduled
    pub dep_time: ScheduleTime,
    pub travel_dist_approximate: f64,
    /// Ride time as accounted by the search
    pub travel_time: Seconds,
}

impl TransportRouteResultSegment {
    pub fn start_stop(&self) -> Option<&TransportStop> {
        self.route.stop(self.start)
    }

    pub fn end_stop(&self) -> Option<&TransportStop> {
        self.route.stop(self.end)
    }

    pub fn travel_stops(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Sum of stop-to-stop distances of the ride.
    pub fn travel_dist(&self) -> f64 {
        self.route
            .forward_stops
            .get(self.start..=self.end)
            .map_or(0.0, |stops| {
                stops.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
            })
    }

    /// Scheduled arrival at the end stop, when the ride is scheduled.
    pub fn arrival_time(&self) -> Option<ScheduleTime> {
        if self.dep_time < 0 {
            return None;
        }
        let schedule = self.route.schedule.as_ref()?;
        let intervals = schedule.avg_stop_intervals.get(self.start..self.end)?;
        Some(self.dep_time + intervals.iter().sum::<ScheduleTime>())
    }

    /// Route geometry between the boarding and alighting stops.
    ///
    /// The merged route ways are scanned node by node: the node closest to the
    /// boarding stop restarts the polyline and the node closest to the
    /// alighting stop ends it, both within 150 m. Without such nodes the ride
    /// is drawn straight through its stops.
    pub fn get_geometry(&self) -> Vec<Way> {
        let (Some(start), Some(end)) = (self.start_stop(), self.end_stop()) else {
            return Vec::new();
        };
        let mut nodes = Vec::new();
        let mut end_ind = None;
        let mut min_start = GEOMETRY_STOP_THRESHOLD;
        let mut min_end = GEOMETRY_STOP_THRESHOLD;
        for node in self
            .route
            .merged_forward_ways()
            .into_iter()
            .flat_map(|way| way.nodes)
        {
            let to_start = geometry::distance(node.y, node.x, start.lat(), start.lon());
            if to_start < min_start {
                min_start = to_start;
                nodes.clear();
                end_ind = None;
            }
            nodes.push(node);
            let to_end = geometry::distance(node.y, node.x, end.lat(), end.lon());
            if to_end < min_end {
                min_end = to_end;
                end_ind = Some(nodes.len());
            }
        }

        let way = match end_ind {
            Some(end_ind) if !nodes.is_empty() => {
                nodes.truncate(end_ind);
                Way::with_nodes(GEOMETRY_WAY_ID, nodes)
            }
            _ => {
                let stops = self
                    .route
                    .forward_stops
                    .get(self.start..=self.end)
                    .unwrap_or_default();
                Way::with_nodes(
                    STOPS_WAY_ID,
                    stops
                        .iter()
                        .map(|st| coord! { x: st.lon(), y: st.lat() })
                        .collect(),
                )
            }
        };
        vec![way]
    }
}

/// A complete itinerary: rides in order plus the final walk.
#[derive(Debug, Clone)]
pub struct TransportRouteResult {
    pub segments: Vec<TransportRouteResultSegment>,
    pub finish_walk_dist: f64,
    pub route_time: Seconds,
    cfg: Arc<TransportRoutingConfiguration>,
}

impl TransportRouteResult {
    pub fn new(cfg: Arc<TransportRoutingConfiguration>) -> Self {
        Self {
            segments: Vec::new(),
            finish_walk_dist: 0.0,
            route_time: 0.0,
            cfg,
        }
    }

    pub fn route_ids(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.segments.iter().map(|s| s.route.id)
    }

    pub fn walk_dist(&self) -> f64 {
        self.finish_walk_dist + self.segments.iter().map(|s| s.walk_dist).sum::<f64>()
    }

    pub fn walk_time(&self) -> Seconds {
        self.walk_dist() / self.cfg.walk_speed
    }

    pub fn travel_dist(&self) -> f64 {
        self.segments.iter().map(TransportRouteResultSegment::travel_dist).sum()
    }

    /// Riding time: scheduled stop intervals, or distance over the route type speed.
    pub fn travel_time(&self) -> Seconds {
        self.segments
            .iter()
            .map(|s| {
                if self.cfg.use_schedule {
                    s.route.schedule.as_ref().map_or(0.0, |schedule| {
                        (s.start..s.end)
                            .filter_map(|k| schedule.stop_interval(k))
                            .map(|interval| f64::from(interval) * crate::SCHEDULE_TICK_SECONDS)
                            .sum()
                    })
                } else {
                    let speed = self.cfg.speed_by_route_type(&s.route.route_type);
                    let ride = if speed > 0.0 { s.travel_dist() / speed } else { 0.0 };
                    self.cfg.boarding_time + ride
                }
            })
            .sum()
    }

    pub fn stops(&self) -> usize {
        self.segments.iter().map(TransportRouteResultSegment::travel_stops).sum()
    }

    pub fn changes(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    pub fn is_walk_only(&self) -> bool {
        self.segments.is_empty()
    }
}

fn stop_name(stop: Option<&TransportStop>) -> &str {
    stop.map_or("?", |st| st.name.as_str())
}

impl fmt::Display for TransportRouteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Route {} stops, {} changes, {:.1} min: {:.0} m walk ({:.1} min), {:.0} m travel ({:.1} min)",
            self.stops(),
            self.changes(),
            self.route_time / 60.0,
            self.walk_dist(),
            self.walk_time() / 60.0,
            self.travel_dist(),
            self.travel_time() / 60.0,
        )?;
        for s in &self.segments {
            writeln!(
                f,
                "  {} {} [{}] {} -> {} ({} stops, walk {:.0} m)",
                s.route.route_type,
                s.route.adjusted_route_ref(false),
                s.route.id,
                stop_name(s.start_stop()),
                stop_name(s.end_stop()),
                s.travel_stops(),
                s.walk_dist,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransportSchedule;

    fn line(lons: &[f64]) -> TransportRoute {
        let mut route = TransportRoute::new(1, "bus");
        route.forward_stops = lons
            .iter()
            .enumerate()
            .map(|(i, &lon)| TransportStop::new(i as i64 + 1, 0.0, lon))
            .collect();
        route
    }

    fn ride(route: TransportRoute, start: usize, end: usize) -> TransportRouteResultSegment {
        TransportRouteResultSegment {
            route: Arc::new(route),
            start,
            end,
            walk_dist: 100.0,
            walk_time: 100.0,
            dep_time: -1,
            travel_dist_approximate: 0.0,
            travel_time: 0.0,
        }
    }

    #[test]
    fn geometry_is_cut_between_the_stops() {
        let mut route = line(&[0.0, 0.01, 0.02, 0.03]);
        route.forward_ways = vec![Way::with_nodes(
            5,
            (0..=30)
                .map(|i| coord! { x: f64::from(i) * 0.001, y: 0.0 })
                .collect(),
        )];
        let geometry = ride(route, 1, 2).get_geometry();
        assert_eq!(geometry.len(), 1);
        let way = &geometry[0];
        assert_eq!(way.id, GEOMETRY_WAY_ID);
        assert!((way.nodes[0].x - 0.01).abs() < 1e-9);
        assert!((way.nodes[way.nodes.len() - 1].x - 0.02).abs() < 1e-9);
    }

    #[test]
    fn geometry_falls_back_to_stops() {
        let route = line(&[0.0, 0.01, 0.02]);
        let geometry = ride(route, 0, 2).get_geometry();
        assert_eq!(geometry[0].id, STOPS_WAY_ID);
        assert_eq!(geometry[0].nodes.len(), 3);
    }

    #[test]
    fn arrival_follows_stop_intervals() {
        let mut route = line(&[0.0, 0.01, 0.02]);
        route.schedule = Some(TransportSchedule {
            trip_intervals: vec![100],
            avg_stop_intervals: vec![5, 7],
            avg_wait_intervals: vec![],
        });
        let mut segment = ride(route, 0, 2);
        assert_eq!(segment.arrival_time(), None);
        segment.dep_time = 100;
        assert_eq!(segment.arrival_time(), Some(112));
    }

    #[test]
    fn accessors_sum_over_segments() {
        let cfg = Arc::new(TransportRoutingConfiguration::default());
        let mut result = TransportRouteResult::new(cfg);
        result.finish_walk_dist = 50.0;
        result.segments.push(ride(line(&[0.0, 0.01, 0.02]), 0, 2));
        result.segments.push(ride(line(&[0.02, 0.03]), 0, 1));
        assert_eq!(result.stops(), 3);
        assert_eq!(result.changes(), 1);
        assert!((result.walk_dist() - 250.0).abs() < 1e-9);
        assert!((result.walk_time() - 250.0).abs() < 1e-9);
        let expected = result.travel_dist() / (30.0 / 3.6);
        assert!((result.travel_time() - expected).abs() < 1e-6);
        assert!(result.to_string().starts_with("Route 3 stops, 1 changes"));
    }

    #[test]
    fn display_lists_rides_by_stop_name() {
        let mut route = line(&[0.0, 0.01, 0.02]);
        route.reference = "1".to_string();
        route.forward_stops[0].name = "Dam".to_string();
        route.forward_stops[2].name = "Zuid".to_string();
        let mut result = TransportRouteResult::new(Arc::new(TransportRoutingConfiguration::default()));
        result.segments.push(ride(route, 0, 2));
        result.segments.push(ride(line(&[0.02, 0.03]), 0, 5));

        let text = result.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "  bus 1 [1] Dam -> Zuid (2 stops, walk 100 m)");
        // end index past the last stop
        assert!(lines[2].contains(" -> ? "), "got {}", lines[2]);
    }
}
