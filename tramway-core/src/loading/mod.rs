//! This module is responsible for reading transport stops and routes from
//! map data indexes, merging records of the same stop found in several files
//! and stitching routes whose stop sequence is split between files.

mod combine;
mod index;
mod memory;
mod raw_types;
mod stops_reader;

pub use combine::{combine_route, combine_segments_of_same_route, parse_route_parts_to_segments};
pub use index::{StopsQuery, TransportIndex};
pub use memory::MemoryTransportIndex;
pub use raw_types::{
    ExitRecord, IncompleteRouteRecord, IndexDocument, RouteRecord, RouteStopRecord, StopRecord,
    WayRecord,
};
pub use stops_reader::{RoutesCache, TransportRouteStopsReader};
