use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::{ScheduleTime, geometry};

/// Geometry node (x = longitude, y = latitude)
pub type Node = Coord<f64>;

/// Polyline fragment of a route geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<Node>,
}

impl Way {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            nodes: Vec::new(),
        }
    }

    pub fn with_nodes(id: i64, nodes: Vec<Node>) -> Self {
        Self { id, nodes }
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn first_node(&self) -> Option<Node> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<Node> {
        self.nodes.last().copied()
    }

    pub fn reverse_nodes(&mut self) {
        self.nodes.reverse();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Sub-location of a stop, e.g. a subway entrance
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStopExit {
    pub reference: String,
    pub x31: i32,
    pub y31: i32,
    pub location: Point<f64>,
}

impl TransportStopExit {
    pub fn new(reference: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            reference: reference.into(),
            x31: geometry::get_31_tile_number_x(lon),
            y31: geometry::get_31_tile_number_y(lat),
            location: Point::new(lon, lat),
        }
    }

    /// Places the exit at tile `(dx, dy)` of `zoom`.
    pub fn set_location(&mut self, zoom: u8, dx: i32, dy: i32) {
        self.x31 = dx << (31 - zoom);
        self.y31 = dy << (31 - zoom);
        self.location = Point::new(
            geometry::get_31_longitude_x(self.x31),
            geometry::get_31_latitude_y(self.y31),
        );
    }

    pub fn content_eq(&self, other: &Self) -> bool {
        self.x31 == other.x31 && self.y31 == other.y31 && self.reference == other.reference
    }
}

/// Average timetable of a route.
///
/// All values are in schedule ticks of ten seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSchedule {
    /// Interval from the previous trip start, first entry relative to the reference departure
    pub trip_intervals: Vec<ScheduleTime>,
    /// Average travel between consecutive stops, one entry less than the stop count
    pub avg_stop_intervals: Vec<ScheduleTime>,
    pub avg_wait_intervals: Vec<ScheduleTime>,
}

impl TransportSchedule {
    pub fn is_empty(&self) -> bool {
        self.trip_intervals.is_empty()
    }

    /// Absolute start of every trip at the first stop.
    pub fn trip_start_times(&self) -> Vec<ScheduleTime> {
        self.trip_intervals
            .iter()
            .scan(0, |t, &interval| {
                *t += interval;
                Some(*t)
            })
            .collect()
    }

    /// Travel from the first stop to `stop_index`; intervals absent from the data count as zero.
    pub fn offset_to_stop(&self, stop_index: usize) -> ScheduleTime {
        self.avg_stop_intervals.iter().take(stop_index).sum()
    }

    /// Interval between stop `index` and `index + 1`.
    pub fn stop_interval(&self, index: usize) -> Option<ScheduleTime> {
        self.avg_stop_intervals.get(index).copied()
    }
}
