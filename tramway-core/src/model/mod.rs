//! Data model for public transport route planning
//!
//! Contains stops, routes, schedules and route geometry as read from the map data.

pub mod transit;

pub use transit::{
    Node, TransportRoute, TransportSchedule, TransportStop, TransportStopExit, Way,
};
