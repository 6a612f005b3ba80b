//! Transit entities: stops, routes and their schedules

pub mod route;
pub mod stop;
pub mod types;

pub use route::TransportRoute;
pub use stop::TransportStop;
pub use types::{Node, TransportSchedule, TransportStopExit, Way};
