use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use crate::Error;
use crate::model::TransportStop;
use crate::routing::{TransportRouteResult, TransportRouteResultSegment};

impl TransportRouteResult {
    /// Converts the itinerary to a `GeoJSON` `FeatureCollection`: one feature
    /// per ride, preceded by the transfer walk from the previous ride.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::new();
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                let previous = &self.segments[idx - 1];
                if let (Some(from), Some(to)) = (previous.end_stop(), segment.start_stop()) {
                    features.push(create_transfer_feature(idx, from, to, segment)?);
                }
            }
            features.push(create_transit_feature(idx, segment)?);
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn stop_coord(stop: &TransportStop) -> Coord<f64> {
    Coord {
        x: stop.lon(),
        y: stop.lat(),
    }
}

fn create_transit_feature(
    leg_idx: usize,
    segment: &TransportRouteResultSegment,
) -> Result<Feature, Error> {
    let coords: Vec<Coord<f64>> = segment
        .get_geometry()
        .into_iter()
        .flat_map(|way| way.nodes)
        .collect();
    let geometry = Geometry::new(GeoJsonValue::from(&LineString::new(coords)));
    let route = &segment.route;
    let name = |stop: Option<&TransportStop>| stop.map(|s| s.name.clone()).unwrap_or_default();

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "leg_type": "transit",
            "leg_index": leg_idx,
            "route_id": route.id,
            "route_ref": route.adjusted_route_ref(false),
            "route_type": route.route_type,
            "route_name": route.name,
            "color": route.color,
            "from_stop": name(segment.start_stop()),
            "to_stop": name(segment.end_stop()),
            "stops": segment.travel_stops(),
            "departure_time": segment.dep_time,
            "arrival_time": segment.arrival_time(),
            "travel_time": segment.travel_time,
            "travel_dist": segment.travel_dist(),
        }
    });
    Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

fn create_transfer_feature(
    leg_idx: usize,
    from: &TransportStop,
    to: &TransportStop,
    next: &TransportRouteResultSegment,
) -> Result<Feature, Error> {
    let line = LineString::new(vec![stop_coord(from), stop_coord(to)]);
    let geometry = Geometry::new(GeoJsonValue::from(&line));

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "leg_type": "transfer_walk",
            "leg_index": leg_idx,
            "from_stop": from.name,
            "to_stop": to.name,
            "walk_dist": next.walk_dist,
            "walk_time": next.walk_time,
        }
    });
    Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::TransportRoute;
    use crate::routing::TransportRoutingConfiguration;

    fn ride(id: i64, lons: &[f64]) -> TransportRouteResultSegment {
        let mut route = TransportRoute::new(id, "tram");
        route.forward_stops = lons
            .iter()
            .enumerate()
            .map(|(i, &lon)| TransportStop::new(i as i64 + 1, 0.0, lon).with_name(format!("S{i}")))
            .collect();
        TransportRouteResultSegment {
            route: Arc::new(route),
            start: 0,
            end: lons.len() - 1,
            walk_dist: 80.0,
            walk_time: 80.0,
            dep_time: -1,
            travel_dist_approximate: 0.0,
            travel_time: 120.0,
        }
    }

    #[test]
    fn rides_and_transfers_become_features() {
        let mut result = TransportRouteResult::new(Arc::new(TransportRoutingConfiguration::default()));
        result.segments.push(ride(1, &[0.0, 0.01]));
        result.segments.push(ride(2, &[0.0105, 0.02, 0.03]));

        let collection = result.to_geojson().unwrap();
        assert_eq!(collection.features.len(), 3);
        let kinds: Vec<String> = collection
            .features
            .iter()
            .map(|f| f.property("leg_type").and_then(|v| v.as_str()).unwrap_or_default().to_string())
            .collect();
        assert_eq!(kinds, vec!["transit", "transfer_walk", "transit"]);

        let text = result.to_geojson_string().unwrap();
        assert!(text.contains("FeatureCollection"));
    }
}
