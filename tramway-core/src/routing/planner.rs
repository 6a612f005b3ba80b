//! Best-first search over boarding opportunities.
//!
//! Search nodes live in an arena and point to their parent by index. The
//! frontier is ordered by elapsed seconds from the start; ties pop in
//! insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use geo::Point;
use hashbrown::HashMap;
use log::{debug, info, trace};

use super::context::TransportRoutingContext;
use super::progress::ProgressStatus;
use super::result::{TransportRouteResult, TransportRouteResultSegment};
use super::segment::TransportRouteSegment;
use crate::{Error, SCHEDULE_TICK_SECONDS, Seconds, geometry};

/// Where a node was reached from: riding `node` up to stop `stop`.
#[derive(Debug, Clone, Copy)]
struct ParentLink {
    node: usize,
    stop: usize,
    travel_time: Seconds,
    travel_dist: f64,
}

#[derive(Debug)]
struct SearchNode {
    segment: TransportRouteSegment,
    parent: Option<ParentLink>,
    /// Walk to the boarding stop, or to the destination for finish nodes
    walk_dist: f64,
    dist_from_start: Seconds,
    depth: u32,
}

#[derive(Debug, Clone, Copy)]
struct State {
    dist: Seconds,
    seq: u64,
    node: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

// Min-heap by distance, FIFO among equal distances
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Frontier {
    heap: BinaryHeap<State>,
    seq: u64,
}

impl Frontier {
    fn push(&mut self, node: usize, dist: Seconds) {
        self.heap.push(State {
            dist,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<State> {
        self.heap.pop()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

struct Search {
    nodes: Vec<SearchNode>,
    frontier: Frontier,
}

impl Search {
    fn push(&mut self, node: SearchNode) {
        let dist = node.dist_from_start;
        self.nodes.push(node);
        self.frontier.push(self.nodes.len() - 1, dist);
    }

    /// The same trip already appears on the path leading to `node`.
    fn was_visited(&self, node: usize, candidate: &TransportRouteSegment) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            let n = &self.nodes[idx];
            if n.segment.same_trip(candidate) {
                return true;
            }
            current = n.parent.map(|p| p.node);
        }
        false
    }
}

/// Plans public transport itineraries from `start` to `end` (x = longitude,
/// y = latitude).
///
/// Results are sorted by total time and free of itineraries whose routes are
/// covered, in order, by a faster one. An empty list means no itinerary was
/// found, or the search was cancelled.
///
/// # Errors
///
/// Returns an error when map data cannot be read, and in strict mode on data
/// inconsistencies or a start route type without speed.
#[allow(clippy::too_many_lines)]
pub fn build_transport_route(
    ctx: &mut TransportRoutingContext<'_>,
    start: Point<f64>,
    end: Point<f64>,
) -> Result<Vec<TransportRouteResult>, Error> {
    let begin = Instant::now();
    let cfg = Arc::clone(&ctx.cfg);
    let start31 = (
        geometry::get_31_tile_number_x(start.x()),
        geometry::get_31_tile_number_y(start.y()),
    );
    let end31 = (
        geometry::get_31_tile_number_x(end.x()),
        geometry::get_31_tile_number_y(end.y()),
    );
    let start_segments = ctx.get_transport_stops(start31.0, start31.1, false)?;
    let end_segments: HashMap<u64, TransportRouteSegment> = ctx
        .get_transport_stops(end31.0, end31.1, false)?
        .into_iter()
        .map(|segment| (segment.key(), segment))
        .collect();
    if start_segments.is_empty() {
        debug!("No transport stops within walking reach of the start");
        return Ok(Vec::new());
    }

    let mut search = Search {
        nodes: Vec::with_capacity(start_segments.len() * 4),
        frontier: Frontier::default(),
    };
    for segment in start_segments {
        if cfg.strict && cfg.speed_by_route_type(&segment.route.route_type) <= 0.0 {
            return Err(Error::Configuration(format!(
                "route type '{}' of route {} at the start has no travel speed",
                segment.route.route_type, segment.route.id
            )));
        }
        let Some(stop) = segment.boarding_stop() else {
            continue;
        };
        let walk_dist = geometry::point_distance(stop.location, start);
        search.push(SearchNode {
            segment,
            parent: None,
            walk_dist,
            dist_from_start: walk_dist / cfg.walk_speed,
            depth: 1,
        });
    }

    let mut finish_time = cfg.max_route_time;
    let max_travel_time_cmp_to_walk = geometry::point_distance(start, end) / cfg.walk_speed;
    let mut visited: HashMap<u64, Seconds> = HashMap::new();
    let mut results: Vec<usize> = Vec::new();

    while let Some(State { node: current, .. }) = search.frontier.pop() {
        if ctx.is_cancelled() {
            return Ok(Vec::new());
        }
        let node = &search.nodes[current];
        let segment = node.segment.clone();
        let (dist_from_start, depth) = (node.dist_from_start, node.depth);

        match visited.get(&segment.key()) {
            Some(&seen) if seen <= dist_from_start => continue,
            Some(&seen) => debug!(
                "Segment {} reached in {dist_from_start:.1}s after being marked at {seen:.1}s",
                segment.key()
            ),
            None => {}
        }
        visited.insert(segment.key(), dist_from_start);
        ctx.stats.visited_routes += 1;

        if depth > cfg.max_number_of_changes + 1 {
            continue;
        }
        if dist_from_start > finish_time + cfg.finish_time_seconds {
            break;
        }
        if dist_from_start > max_travel_time_cmp_to_walk {
            continue;
        }
        let speed = cfg.speed_by_route_type(&segment.route.route_type);
        if speed <= 0.0 {
            trace!(
                "Route {} of type '{}' has no travel speed",
                segment.route.id, segment.route.route_type
            );
            continue;
        }
        let Some(mut prev_stop) = segment.boarding_stop() else {
            continue;
        };

        let mut finish: Option<SearchNode> = None;
        let mut min_dist = 0.0;
        let mut travel_dist = 0.0;
        let mut travel_time = 0.0;
        for ind in segment.seg_start + 1..segment.len() {
            if ctx.is_cancelled() {
                return Ok(Vec::new());
            }
            let stop_key = match segment.key_at(ind) {
                Ok(key) => key,
                Err(err) => {
                    cfg.tolerate(err)?;
                    break;
                }
            };
            let Some(stop) = segment.stop(ind) else {
                break;
            };
            let segment_dist = prev_stop.distance_to(stop);
            travel_dist += segment_dist;
            if cfg.use_schedule {
                let interval = segment
                    .route
                    .schedule
                    .as_ref()
                    .and_then(|schedule| schedule.stop_interval(ind - 1));
                let Some(interval) = interval else {
                    cfg.tolerate(Error::DataInconsistency(format!(
                        "route {} has no schedule interval after stop {}",
                        segment.route.id,
                        ind - 1
                    )))?;
                    break;
                };
                travel_time += f64::from(interval) * SCHEDULE_TICK_SECONDS;
            } else {
                travel_time += cfg.stop_time + segment_dist / speed;
            }
            let arrival = dist_from_start + travel_time;
            if arrival > finish_time + cfg.finish_time_seconds {
                break;
            }
            visited
                .entry(stop_key)
                .and_modify(|seen| *seen = seen.min(arrival))
                .or_insert(arrival);

            let changes = ctx.get_transport_stops(stop.x31, stop.y31, true)?;
            ctx.stats.visited_stops += 1;
            for candidate in changes {
                if ctx.is_cancelled() {
                    return Ok(Vec::new());
                }
                if search.was_visited(current, &candidate) {
                    continue;
                }
                let Some(boarding) = candidate.boarding_stop() else {
                    continue;
                };
                let walk_dist = boarding.distance_to(stop);
                let walk_time = walk_dist / cfg.walk_speed + cfg.change_time + cfg.boarding_time;
                let mut dist = arrival + walk_time;
                if cfg.use_schedule {
                    let departs = f64::from(candidate.departure_time - cfg.schedule_time_of_day)
                        * SCHEDULE_TICK_SECONDS;
                    if departs < dist {
                        continue;
                    }
                    dist = departs;
                }
                search.push(SearchNode {
                    segment: candidate,
                    parent: Some(ParentLink {
                        node: current,
                        stop: ind,
                        travel_time,
                        travel_dist,
                    }),
                    walk_dist,
                    dist_from_start: dist,
                    depth: depth + 1,
                });
            }

            if let Some(finish_segment) = end_segments.get(&stop_key) {
                let dist_to_end = geometry::point_distance(stop.location, end);
                if dist_to_end < cfg.walk_radius && (finish.is_none() || min_dist > dist_to_end) {
                    min_dist = dist_to_end;
                    finish = Some(SearchNode {
                        segment: finish_segment.clone(),
                        parent: Some(ParentLink {
                            node: current,
                            stop: ind,
                            travel_time,
                            travel_dist,
                        }),
                        walk_dist: dist_to_end,
                        dist_from_start: arrival + dist_to_end / cfg.walk_speed,
                        depth: depth + 1,
                    });
                }
            }
            prev_stop = stop;
        }

        if let Some(finish) = finish {
            finish_time = finish_time.min(finish.dist_from_start);
            if finish.dist_from_start < finish_time + cfg.finish_time_seconds
                && (finish.dist_from_start < max_travel_time_cmp_to_walk || results.is_empty())
            {
                search.nodes.push(finish);
                results.push(search.nodes.len() - 1);
            }
        }

        ctx.report_status(&ProgressStatus {
            distance_from_begin: dist_from_start,
            frontier_size: search.frontier.len(),
            visited_segments: visited.len(),
        });
    }

    let results = prepare_results(ctx, &search, results);
    ctx.stats.load_time += begin.elapsed();
    info!(
        "Found {} routes in {:.0?}: visited {} routes, {} stops, {} tiles (read {:.0?}, segments {:.0?}), \
         loaded ways {}, wrong loaded ways {}",
        results.len(),
        begin.elapsed(),
        ctx.stats.visited_routes,
        ctx.stats.visited_stops,
        ctx.stats.loaded_tiles,
        ctx.stats.read_time,
        ctx.stats.build_segments_time,
        ctx.stats.loaded_ways,
        ctx.stats.wrong_loaded_ways,
    );
    Ok(results)
}

fn prepare_results(
    ctx: &TransportRoutingContext<'_>,
    search: &Search,
    mut finishes: Vec<usize>,
) -> Vec<TransportRouteResult> {
    finishes.sort_by(|a, b| {
        search.nodes[*a]
            .dist_from_start
            .total_cmp(&search.nodes[*b].dist_from_start)
    });
    let mut accepted: Vec<TransportRouteResult> = Vec::new();
    for finish in finishes {
        if ctx.is_cancelled() {
            return Vec::new();
        }
        let node = &search.nodes[finish];
        let mut result = TransportRouteResult::new(Arc::clone(&ctx.cfg));
        result.route_time = node.dist_from_start;
        result.finish_walk_dist = node.walk_dist;

        let mut link = node.parent;
        while let Some(ParentLink {
            node: parent_idx,
            stop,
            travel_time,
            travel_dist,
        }) = link
        {
            let parent = &search.nodes[parent_idx];
            result.segments.push(TransportRouteResultSegment {
                route: Arc::clone(&parent.segment.route),
                start: parent.segment.seg_start,
                end: stop,
                walk_dist: parent.walk_dist,
                walk_time: parent.walk_dist / ctx.cfg.walk_speed,
                dep_time: parent.segment.departure_time,
                travel_dist_approximate: travel_dist,
                travel_time,
            });
            link = parent.parent;
        }
        result.segments.reverse();

        if !accepted.iter().any(|fast| include_route(fast, &result)) {
            accepted.push(result);
        }
    }
    accepted
}

/// `test` rides every route of `fast`, in the same order, possibly with others in between.
pub(crate) fn include_route(fast: &TransportRouteResult, test: &TransportRouteResult) -> bool {
    if test.segments.len() < fast.segments.len() {
        return false;
    }
    let mut remaining = test.route_ids();
    fast.route_ids()
        .all(|id| remaining.any(|test_id| test_id == id))
}
