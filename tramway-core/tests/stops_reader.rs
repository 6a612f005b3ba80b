mod common;

use common::*;
use tramway_core::prelude::*;

fn everywhere() -> StopsQuery {
    StopsQuery {
        left: 0,
        right: 1 << 24,
        top: 0,
        bottom: 1 << 24,
    }
}

fn ids(stops: &[TransportStop]) -> Vec<StopId> {
    stops.iter().map(|s| s.id).collect()
}

#[test]
fn deleted_stop_wins_over_later_files() -> Result<(), Error> {
    init_logger();
    let mut update = MemoryTransportIndex::new("update");
    update.add_stop(TransportStop::deleted(2, 0.0, 0.01));
    let base = MemoryTransportIndex::from_routes(
        "base",
        vec![route(1, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.01), (3, 0.0, 0.02)])],
    );

    let mut reader = TransportRouteStopsReader::new(&[&update, &base]);
    let stops = reader.read_merged_transport_stops(&everywhere())?;
    assert_eq!(ids(&stops), vec![1, 3]);

    // file order matters: the deletion only overrides files read after it
    let mut reader = TransportRouteStopsReader::new(&[&base, &update]);
    let stops = reader.read_merged_transport_stops(&everywhere())?;
    assert_eq!(ids(&stops), vec![1, 2, 3]);
    Ok(())
}

#[test]
fn stop_shared_by_files_collects_all_routes() -> Result<(), Error> {
    init_logger();
    let north = MemoryTransportIndex::from_routes(
        "north",
        vec![route(1, "bus", &[(1, 0.0, 0.0), (2, 0.01, 0.0)])],
    );
    let south = MemoryTransportIndex::from_routes(
        "south",
        vec![
            route(1, "bus", &[(1, 0.0, 0.0), (2, 0.01, 0.0)]),
            route(5, "tram", &[(1, 0.0, 0.0), (3, -0.01, 0.0)]),
        ],
    );
    let mut reader = TransportRouteStopsReader::new(&[&north, &south]);
    let stops = reader.read_merged_transport_stops(&everywhere())?;
    assert_eq!(ids(&stops), vec![1, 2, 3]);

    let shared = &stops[0];
    let mut route_ids: Vec<RouteId> = shared.routes.iter().map(|r| r.id).collect();
    route_ids.sort_unstable();
    // route 1 from the second file is not attached twice
    assert_eq!(route_ids, vec![1, 5]);
    assert_eq!(shared.routes_ids, vec![1, 5]);
    Ok(())
}

#[test]
fn stops_outside_the_query_are_not_read() -> Result<(), Error> {
    init_logger();
    let file = MemoryTransportIndex::from_routes(
        "f",
        vec![route(1, "bus", &[(1, 0.0, 0.0), (2, 0.0, 1.0)])],
    );
    let x = tramway_core::geometry::get_31_tile_number_x(1.0);
    let y = tramway_core::geometry::get_31_tile_number_y(0.0);
    let query = StopsQuery::from_tile(15, x >> 16, y >> 16);

    let mut reader = TransportRouteStopsReader::new(&[&file]);
    let stops = reader.read_merged_transport_stops(&query)?;
    assert_eq!(ids(&stops), vec![2]);
    assert_eq!(stops[0].routes[0].forward_stops.len(), 2);
    Ok(())
}

#[test]
fn json_index_is_read_like_any_other() -> Result<(), Error> {
    init_logger();
    let file = MemoryTransportIndex::from_json_str(
        r#"{
            "name": "json",
            "stops": [
                { "id": 1, "name": "Dam", "lat": 52.373, "lon": 4.893,
                  "references_to_routes": [3], "routes_ids": [42],
                  "exits": [ { "reference": "A", "lat": 52.3731, "lon": 4.8931 } ] },
                { "id": 2, "name": "Spui", "lat": 52.368, "lon": 4.889,
                  "references_to_routes": [3], "routes_ids": [42] }
            ],
            "routes": [
                { "offset": 3, "id": 42, "route_type": "tram", "reference": "2",
                  "stops": [
                    { "id": 1, "name": "Dam", "lat": 52.373, "lon": 4.893 },
                    { "id": 2, "name": "Spui", "lat": 52.368, "lon": 4.889 }
                  ] }
            ]
        }"#,
    )?;
    let mut reader = TransportRouteStopsReader::new(&[&file]);
    let stops = reader.read_merged_transport_stops(&everywhere())?;
    assert_eq!(ids(&stops), vec![1, 2]);
    assert_eq!(stops[0].name, "Dam");
    assert_eq!(stops[0].exits.len(), 1);
    assert_eq!(stops[0].routes[0].reference, "2");
    Ok(())
}
