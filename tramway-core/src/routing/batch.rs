use std::sync::Arc;

use geo::Point;
use rayon::prelude::*;

use super::config::TransportRoutingConfiguration;
use super::context::TransportRoutingContext;
use super::planner::build_transport_route;
use super::result::TransportRouteResult;
use crate::Error;
use crate::loading::TransportIndex;

/// Plans many `(start, end)` requests in parallel.
///
/// Every request gets its own [`TransportRoutingContext`]; the map data files
/// are shared read-only. Results are returned in request order.
pub fn build_transport_routes_batch(
    files: &[&dyn TransportIndex],
    cfg: &Arc<TransportRoutingConfiguration>,
    requests: &[(Point<f64>, Point<f64>)],
) -> Vec<Result<Vec<TransportRouteResult>, Error>> {
    requests
        .par_iter()
        .map(|(start, end)| {
            let mut ctx = TransportRoutingContext::new(Arc::clone(cfg), files)?;
            build_transport_route(&mut ctx, *start, *end)
        })
        .collect()
}
