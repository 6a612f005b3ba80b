use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use log::debug;

use super::config::TransportRoutingConfiguration;
use super::progress::{CalculationProgress, ProgressStatus};
use super::segment::TransportRouteSegment;
use crate::loading::{RoutesCache, StopsQuery, TransportIndex, TransportRouteStopsReader};
use crate::model::{TransportRoute, TransportStop};
use crate::{Error, SAME_STOP};

/// Diagnostic counters and timers of one planning request.
#[derive(Debug, Clone, Default)]
pub struct RoutingStats {
    pub visited_routes: usize,
    pub visited_stops: usize,
    pub loaded_ways: usize,
    pub wrong_loaded_ways: usize,
    pub loaded_tiles: usize,
    pub load_time: Duration,
    pub read_time: Duration,
    pub build_segments_time: Duration,
}

/// Per-request state of the planner: configuration, stop reader, and the
/// boarding opportunities found so far, cached by routing tile.
///
/// A context serves one request at a time; concurrent requests each need
/// their own context over the shared map data.
pub struct TransportRoutingContext<'a> {
    pub cfg: Arc<TransportRoutingConfiguration>,
    pub stats: RoutingStats,
    reader: TransportRouteStopsReader<'a>,
    quad_tree: HashMap<i64, Vec<TransportRouteSegment>>,
    walk_radius_31: i64,
    walk_change_radius_31: i64,
    progress: Option<&'a dyn CalculationProgress>,
}

impl<'a> TransportRoutingContext<'a> {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid.
    pub fn new(
        cfg: Arc<TransportRoutingConfiguration>,
        files: &[&'a dyn TransportIndex],
    ) -> Result<Self, Error> {
        Self::with_cache(cfg, files, RoutesCache::default())
    }

    /// Context reusing routes hydrated by an earlier request over the same files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid.
    pub fn with_cache(
        cfg: Arc<TransportRoutingConfiguration>,
        files: &[&'a dyn TransportIndex],
        cache: RoutesCache,
    ) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            walk_radius_31: cfg.walk_radius_31(),
            walk_change_radius_31: cfg.walk_change_radius_31(),
            cfg,
            stats: RoutingStats::default(),
            reader: TransportRouteStopsReader::with_cache(files, cache),
            quad_tree: HashMap::new(),
            progress: None,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn CalculationProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn into_cache(self) -> RoutesCache {
        self.reader.into_cache()
    }

    pub fn is_cancelled(&self) -> bool {
        self.progress.is_some_and(|p| p.is_cancelled())
    }

    pub(crate) fn report_status(&self, status: &ProgressStatus) {
        if let Some(progress) = self.progress {
            progress.report_status(status);
        }
    }

    /// Boarding opportunities within walking reach of `(x31, y31)`.
    ///
    /// Tiles are covered for the walk radius, or the walk-change radius when
    /// `change` is set. Candidates whose boarding stop lies outside the square
    /// of the walk radius around the point are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if a tile cannot be loaded.
    pub fn get_transport_stops(
        &mut self,
        x31: i32,
        y31: i32,
        change: bool,
    ) -> Result<Vec<TransportRouteSegment>, Error> {
        let zoom = self.cfg.zoom_to_load_tiles;
        let shift = 31 - u32::from(zoom);
        let d = if change {
            self.walk_change_radius_31
        } else {
            self.walk_radius_31
        };
        let (x, y) = (i64::from(x31), i64::from(y31));
        let max_tile = (1_i64 << zoom) - 1;
        let (left, right) = ((x - d).max(0) >> shift, ((x + d) >> shift).min(max_tile));
        let (top, bottom) = ((y - d).max(0) >> shift, ((y + d) >> shift).min(max_tile));

        let mut accepted = Vec::new();
        for tx in left..=right {
            for ty in top..=bottom {
                let tile_id = (tx << (zoom + 1)) + ty;
                if !self.quad_tree.contains_key(&tile_id) {
                    let segments = self.load_tile(tx, ty)?;
                    self.quad_tree.insert(tile_id, segments);
                }
                let Some(segments) = self.quad_tree.get(&tile_id) else {
                    continue;
                };
                for segment in segments {
                    let Some(stop) = segment.boarding_stop() else {
                        continue;
                    };
                    if (i64::from(stop.x31) - x).abs() > self.walk_radius_31
                        || (i64::from(stop.y31) - y).abs() > self.walk_radius_31
                    {
                        self.stats.wrong_loaded_ways += 1;
                    } else {
                        self.stats.loaded_ways += 1;
                        accepted.push(segment.clone());
                    }
                }
            }
        }
        Ok(accepted)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn load_tile(&mut self, x: i64, y: i64) -> Result<Vec<TransportRouteSegment>, Error> {
        let begin = Instant::now();
        let query = StopsQuery::from_tile(self.cfg.zoom_to_load_tiles, x as i32, y as i32);
        let stops = self.reader.read_merged_transport_stops(&query)?;
        self.stats.read_time += begin.elapsed();

        let begin = Instant::now();
        let segments = self.load_transport_segments(&stops)?;
        self.stats.build_segments_time += begin.elapsed();
        self.stats.loaded_tiles += 1;
        debug!(
            "Tile {}/{x}/{y}: {} stops, {} segments",
            self.cfg.zoom_to_load_tiles,
            stops.len(),
            segments.len()
        );
        Ok(segments)
    }

    /// Expands merged stops into boarding opportunities, one per route calling
    /// at the stop, or one per scheduled trip inside the departure window.
    fn load_transport_segments(
        &self,
        stops: &[TransportStop],
    ) -> Result<Vec<TransportRouteSegment>, Error> {
        let mut segments = Vec::new();
        for stop in stops {
            if stop.is_deleted() || stop.routes.is_empty() {
                continue;
            }
            for route in &stop.routes {
                let Some(stop_index) = find_stop_index(route, stop) else {
                    self.cfg.tolerate(Error::DataInconsistency(format!(
                        "stop {} is not on its route {} ({})",
                        stop.id, route.id, route.reference
                    )))?;
                    continue;
                };
                if self.cfg.use_schedule {
                    self.load_schedule_route_segments(&mut segments, route, stop_index)?;
                } else {
                    self.push_segment(&mut segments, route, stop_index, -1)?;
                }
            }
        }
        Ok(segments)
    }

    fn load_schedule_route_segments(
        &self,
        segments: &mut Vec<TransportRouteSegment>,
        route: &Arc<TransportRoute>,
        stop_index: usize,
    ) -> Result<(), Error> {
        let Some(schedule) = &route.schedule else {
            return self.cfg.tolerate(Error::DataInconsistency(format!(
                "route {} ({}) has no schedule",
                route.id, route.reference
            )));
        };
        let window_start = self.cfg.schedule_time_of_day;
        let window_end = window_start + self.cfg.schedule_max_time;
        let offset = schedule.offset_to_stop(stop_index);
        for trip_start in schedule.trip_start_times() {
            let departure = trip_start + offset;
            if (window_start..=window_end).contains(&departure) {
                self.push_segment(segments, route, stop_index, departure)?;
            }
        }
        Ok(())
    }

    fn push_segment(
        &self,
        segments: &mut Vec<TransportRouteSegment>,
        route: &Arc<TransportRoute>,
        stop_index: usize,
        departure: i32,
    ) -> Result<(), Error> {
        match TransportRouteSegment::new(Arc::clone(route), stop_index, departure) {
            Ok(segment) => segments.push(segment),
            Err(err) => self.cfg.tolerate(err)?,
        }
        Ok(())
    }
}

/// Position of `stop` in the route: same id, else the nearest stop closer than [`SAME_STOP`].
fn find_stop_index(route: &TransportRoute, stop: &TransportStop) -> Option<usize> {
    if let Some(index) = route
        .forward_stops
        .iter()
        .position(|st| st.id == stop.id && !st.is_missing_stop())
    {
        return Some(index);
    }
    route
        .forward_stops
        .iter()
        .enumerate()
        .filter(|(_, st)| !st.is_missing_stop())
        .map(|(i, st)| (i, st.distance_to(stop)))
        .filter(|(_, d)| *d < SAME_STOP)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
