//! Public transport route planning over tile-partitioned transit data.
//!
//! The planner explores stops and routes loaded lazily, tile by tile, from one
//! or more map-data indexes, stitching route fragments that are split between
//! files, and returns ranked itineraries that combine walking and riding.

pub mod error;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;

/// Identifier of a transport route inside the map data.
pub type RouteId = i64;
/// Identifier of a transport stop inside the map data.
pub type StopId = i64;
/// Elapsed time in seconds.
pub type Seconds = f64;
/// Schedule time in ticks of ten seconds.
pub type ScheduleTime = i32;

/// Two stops closer than this (meters) are treated as the same place.
pub const SAME_STOP: f64 = 40.0;
/// Missing-stop placeholders closer than this (meters) close a data gap.
pub const MISSING_STOP_SEARCH_RADIUS: f64 = 15_000.0;
/// Zoom of the stop index inside the map data files.
pub const TRANSPORT_STOP_ZOOM: u8 = 24;
/// Single route reference marking a stop as deleted.
pub const DELETED_STOP: i32 = -1;
/// Seconds in one schedule tick.
pub const SCHEDULE_TICK_SECONDS: f64 = 10.0;
