pub use crate::Error;
pub use crate::{DELETED_STOP, MISSING_STOP_SEARCH_RADIUS, SAME_STOP, TRANSPORT_STOP_ZOOM};

// Map data
pub use crate::loading::{
    MemoryTransportIndex, RoutesCache, StopsQuery, TransportIndex, TransportRouteStopsReader,
};
pub use crate::model::{TransportRoute, TransportSchedule, TransportStop, TransportStopExit, Way};

// Planning
pub use crate::routing::{
    CalculationProgress, CancellationFlag, TransportRouteResult, TransportRouteResultSegment,
    TransportRoutingConfiguration, TransportRoutingContext, build_transport_route,
    build_transport_routes_batch,
};

// Core types
pub use crate::RouteId;
pub use crate::ScheduleTime;
pub use crate::Seconds;
pub use crate::StopId;
