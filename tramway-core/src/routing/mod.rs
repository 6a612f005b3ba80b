mod batch;
mod config;
mod context;
mod itinerary;
mod planner;
mod progress;
mod result;
mod segment;

pub use batch::build_transport_routes_batch;
pub use config::TransportRoutingConfiguration;
pub use context::{RoutingStats, TransportRoutingContext};
pub use planner::build_transport_route;
pub use progress::{CalculationProgress, CancellationFlag, ProgressStatus};
pub use result::{GEOMETRY_WAY_ID, STOPS_WAY_ID, TransportRouteResult, TransportRouteResultSegment};
pub use segment::{SegmentKey, TransportRouteSegment};
