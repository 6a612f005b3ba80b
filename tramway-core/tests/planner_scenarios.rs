mod common;

use std::sync::{Arc, Mutex};

use common::*;
use tramway_core::prelude::*;
use tramway_core::routing::ProgressStatus;

#[test]
fn no_stops_near_start_or_end() -> Result<(), Error> {
    init_logger();
    let file = branching_network();
    let results = plan(&[&file], config(), point(10.0, 10.0), point(10.01, 10.01))?;
    assert!(results.is_empty());
    Ok(())
}

#[test]
fn single_route_ride() -> Result<(), Error> {
    init_logger();
    let line = route(
        10,
        "bus",
        &[(1, 0.0, 0.0), (2, 0.0, 0.02), (3, 0.0, 0.04), (4, 0.0, 0.06)],
    );
    let file = MemoryTransportIndex::from_routes("line", vec![line.clone()]);
    let cfg = config();
    let (start, end) = (point(0.0, -0.001), point(0.0, 0.061));

    let results = plan(&[&file], cfg.clone(), start, end)?;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.segments[0].route.id, 10);
    assert_eq!(result.segments[0].start, 0);
    assert_eq!(result.segments[0].end, 3);
    assert_eq!(result.changes(), 0);
    assert_eq!(result.stops(), 3);

    let first_stop = line.forward_stops[0].location;
    let last_stop = line.forward_stops[3].location;
    let expected =
        walk_time(&cfg, start, first_stop) + ride_time(&cfg, &line) + walk_time(&cfg, last_stop, end);
    assert!(
        (result.route_time - expected).abs() < 1e-6,
        "{} != {expected}",
        result.route_time
    );
    assert!((result.segments[0].walk_dist - 111.2).abs() < 1.0);
    assert!((result.finish_walk_dist - 111.2).abs() < 1.0);
    Ok(())
}

fn transfer_network() -> MemoryTransportIndex {
    MemoryTransportIndex::from_routes(
        "transfer",
        vec![
            route(1, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.02), (100, 0.0, 0.04)]),
            route(2, "bus", &[(100, 0.0, 0.04), (101, 0.02, 0.04), (102, 0.04, 0.04)]),
        ],
    )
}

#[test]
fn changes_are_limited_by_depth() -> Result<(), Error> {
    init_logger();
    let file = transfer_network();
    let (start, end) = (point(0.0, -0.001), point(0.041, 0.04));

    let no_changes = TransportRoutingConfiguration {
        max_number_of_changes: 0,
        ..config()
    };
    let results = plan(&[&file], no_changes, start, end)?;
    assert!(results.iter().all(|r| r.segments.len() < 2));

    let one_change = TransportRoutingConfiguration {
        max_number_of_changes: 1,
        ..config()
    };
    let results = plan(&[&file], one_change, start, end)?;
    assert!(!results.is_empty());
    assert_eq!(route_ids(&results[0]), vec![1, 2]);
    assert_eq!(results[0].changes(), 1);
    let transfer = &results[0].segments[1];
    assert_eq!(transfer.start, 0);
    assert!(transfer.walk_dist < 1.0);
    Ok(())
}

#[test]
fn slower_itineraries_covering_a_faster_one_are_dropped() -> Result<(), Error> {
    init_logger();
    let file = branching_network();
    let cfg = config();
    let (start, end) = (point(BRANCHING_START.0, BRANCHING_START.1), point(BRANCHING_END.0, BRANCHING_END.1));

    let results = plan(&[&file], cfg.clone(), start, end)?;
    let ids: Vec<Vec<RouteId>> = results.iter().map(route_ids).collect();
    // bus 1 then tram 2 arrives before tram 3 but only extends bus 1
    assert_eq!(ids, vec![vec![1], vec![3]]);

    for (i, slow) in results.iter().enumerate() {
        for fast in &results[..i] {
            assert!(fast.route_time <= slow.route_time);
            let fast_ids = route_ids(fast);
            let mut slow_ids = route_ids(slow).into_iter();
            assert!(!fast_ids.iter().all(|id| slow_ids.any(|s| s == *id)));
        }
    }

    let direct_walk = walk_time(&cfg, start, end);
    for result in results.iter().skip(1) {
        assert!(result.route_time <= direct_walk + cfg.finish_time_seconds);
    }
    Ok(())
}

#[derive(Default)]
struct Recorder {
    distances: Mutex<Vec<f64>>,
}

impl CalculationProgress for Recorder {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report_status(&self, status: &ProgressStatus) {
        if let Ok(mut distances) = self.distances.lock() {
            distances.push(status.distance_from_begin);
        }
    }
}

#[test]
fn search_stops_past_the_finish_bound() -> Result<(), Error> {
    init_logger();
    let file = branching_network();
    let cfg = TransportRoutingConfiguration {
        finish_time_seconds: 60.0,
        ..config()
    };
    let recorder = Recorder::default();
    let mut ctx = TransportRoutingContext::new(Arc::new(cfg), &[&file])?.with_progress(&recorder);
    let results = build_transport_route(
        &mut ctx,
        point(BRANCHING_START.0, BRANCHING_START.1),
        point(BRANCHING_END.0, BRANCHING_END.1),
    )?;

    assert_eq!(results.len(), 1);
    let best = results[0].route_time;
    let distances = recorder.distances.lock().map(|d| d.clone()).unwrap_or_default();
    assert!(!distances.is_empty());
    assert!(distances.iter().all(|d| *d <= best + 60.0), "{distances:?}");
    Ok(())
}

struct CancelAfterFirstStep {
    flag: CancellationFlag,
}

impl CalculationProgress for CancelAfterFirstStep {
    fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    fn report_status(&self, _status: &ProgressStatus) {
        self.flag.cancel();
    }
}

#[test]
fn cancelled_search_returns_nothing() -> Result<(), Error> {
    init_logger();
    let file = branching_network();
    let (start, end) = (point(BRANCHING_START.0, BRANCHING_START.1), point(BRANCHING_END.0, BRANCHING_END.1));

    let flag = CancellationFlag::new();
    flag.cancel();
    let mut ctx = TransportRoutingContext::new(Arc::new(config()), &[&file])?.with_progress(&flag);
    assert!(build_transport_route(&mut ctx, start, end)?.is_empty());

    // the first expanded segment already reaches the end
    let progress = CancelAfterFirstStep {
        flag: CancellationFlag::new(),
    };
    let mut ctx = TransportRoutingContext::new(Arc::new(config()), &[&file])?.with_progress(&progress);
    assert!(build_transport_route(&mut ctx, start, end)?.is_empty());
    assert!(progress.is_cancelled());
    Ok(())
}

#[test]
fn scheduled_seeds_follow_trip_starts() -> Result<(), Error> {
    init_logger();
    let mut line = route(7, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.01)]);
    line.schedule = Some(TransportSchedule {
        trip_intervals: vec![0, 60],
        avg_stop_intervals: vec![12],
        avg_wait_intervals: vec![],
    });
    let file = MemoryTransportIndex::from_routes("scheduled", vec![line]);
    let cfg = TransportRoutingConfiguration {
        use_schedule: true,
        schedule_time_of_day: 0,
        schedule_max_time: 120,
        ..config()
    };
    let mut ctx = TransportRoutingContext::new(Arc::new(cfg), &[&file])?;
    let x = tramway_core::geometry::get_31_tile_number_x(0.0);
    let y = tramway_core::geometry::get_31_tile_number_y(0.0);
    let seeds = ctx.get_transport_stops(x, y, false)?;
    let mut departures: Vec<ScheduleTime> = seeds
        .iter()
        .filter(|s| s.seg_start == 0)
        .map(|s| s.departure_time)
        .collect();
    departures.sort_unstable();
    assert_eq!(departures, vec![0, 60]);
    Ok(())
}

#[test]
fn scheduled_ride_uses_stop_intervals() -> Result<(), Error> {
    init_logger();
    let mut line = route(7, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.02), (3, 0.0, 0.04)]);
    line.schedule = Some(TransportSchedule {
        trip_intervals: vec![0, 60],
        avg_stop_intervals: vec![12, 12],
        avg_wait_intervals: vec![],
    });
    let file = MemoryTransportIndex::from_routes("scheduled", vec![line.clone()]);
    let cfg = TransportRoutingConfiguration {
        use_schedule: true,
        schedule_time_of_day: 0,
        schedule_max_time: 120,
        ..config()
    };
    let (start, end) = (point(0.0, -0.001), point(0.0, 0.041));

    let results = plan(&[&file], cfg.clone(), start, end)?;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    let expected = walk_time(&cfg, start, line.forward_stops[0].location)
        + 240.0
        + walk_time(&cfg, line.forward_stops[2].location, end);
    assert!((result.route_time - expected).abs() < 1e-6);
    assert!((result.travel_time() - 240.0).abs() < 1e-9);
    let ride = &result.segments[0];
    assert!(ride.dep_time == 0 || ride.dep_time == 60);
    assert_eq!(ride.arrival_time(), Some(ride.dep_time + 24));
    Ok(())
}

#[test]
fn scheduled_transfer_waits_for_the_next_departure() -> Result<(), Error> {
    init_logger();
    let mut feeder = route(1, "bus", &[(1, 0.0, 0.0), (2, 0.0, 0.04)]);
    feeder.schedule = Some(TransportSchedule {
        trip_intervals: vec![0],
        avg_stop_intervals: vec![30],
        avg_wait_intervals: vec![],
    });
    // leaves the shared stop at 400 s, 700 s and 1000 s
    let mut connection = route(2, "bus", &[(2, 0.0, 0.04), (3, 0.04, 0.04)]);
    connection.schedule = Some(TransportSchedule {
        trip_intervals: vec![40, 30, 30],
        avg_stop_intervals: vec![30],
        avg_wait_intervals: vec![],
    });
    let file = MemoryTransportIndex::from_routes("connection", vec![feeder.clone(), connection.clone()]);
    let cfg = TransportRoutingConfiguration {
        use_schedule: true,
        schedule_time_of_day: 0,
        schedule_max_time: 120,
        ..config()
    };
    let (start, end) = (point(0.0, -0.001), point(0.041, 0.04));

    let results = plan(&[&file], cfg.clone(), start, end)?;
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(route_ids(result), vec![1, 2]);

    // arrival at the shared stop plus the change time is past 400 s
    let arrival = walk_time(&cfg, start, feeder.forward_stops[0].location) + 300.0;
    assert!(arrival + cfg.change_time > 400.0 && arrival + cfg.change_time < 700.0);

    let second = &result.segments[1];
    assert_eq!(second.dep_time, 70);
    assert_eq!(second.arrival_time(), Some(100));
    let expected = 700.0 + 300.0 + walk_time(&cfg, connection.forward_stops[1].location, end);
    assert!(
        (result.route_time - expected).abs() < 1e-6,
        "{} != {expected}",
        result.route_time
    );
    assert!(result.segments.iter().all(|s| s.dep_time != 40));
    Ok(())
}

#[test]
fn route_type_without_speed() -> Result<(), Error> {
    init_logger();
    let file = MemoryTransportIndex::from_routes(
        "horses",
        vec![route(1, "horse", &[(1, 0.0, 0.0), (2, 0.0, 0.02), (3, 0.0, 0.04)])],
    );
    let mut cfg = config();
    cfg.speed.insert("horse".to_string(), 0.0);
    let (start, end) = (point(0.0, -0.001), point(0.0, 0.041));

    assert!(plan(&[&file], cfg.clone(), start, end)?.is_empty());

    cfg.strict = true;
    let err = plan(&[&file], cfg, start, end).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{err}");
    Ok(())
}

#[test]
fn stop_index_overflow_is_skipped_unless_strict() -> Result<(), Error> {
    init_logger();
    let stops: Vec<(StopId, f64, f64)> = (0..1100)
        .map(|i| (i + 1, 0.0, f64::from(i as i32) * 1e-6))
        .collect();
    let file = MemoryTransportIndex::from_routes("long", vec![route(1, "bus", &stops)]);
    let x = tramway_core::geometry::get_31_tile_number_x(0.0005);
    let y = tramway_core::geometry::get_31_tile_number_y(0.0);

    let mut ctx = TransportRoutingContext::new(Arc::new(config()), &[&file])?;
    let seeds = ctx.get_transport_stops(x, y, false)?;
    assert_eq!(seeds.len(), 1024);
    assert!(seeds.iter().all(|s| s.seg_start < 1024));

    let strict = TransportRoutingConfiguration {
        strict: true,
        ..config()
    };
    let mut ctx = TransportRoutingContext::new(Arc::new(strict), &[&file])?;
    let err = ctx.get_transport_stops(x, y, false).unwrap_err();
    assert!(matches!(err, Error::SegmentIdOverflow { seg_start: 1024, .. }), "{err}");
    Ok(())
}

#[test]
fn batch_requests_are_planned_independently() {
    init_logger();
    let file = branching_network();
    let cfg = Arc::new(config());
    let requests = [
        (point(BRANCHING_START.0, BRANCHING_START.1), point(BRANCHING_END.0, BRANCHING_END.1)),
        (point(10.0, 10.0), point(10.01, 10.01)),
    ];
    let results = build_transport_routes_batch(&[&file], &cfg, &requests);
    assert_eq!(results.len(), 2);
    assert!(matches!(&results[0], Ok(r) if !r.is_empty()));
    assert!(matches!(&results[1], Ok(r) if r.is_empty()));
}

#[test]
fn itinerary_exports_to_geojson() -> Result<(), Error> {
    init_logger();
    let file = transfer_network();
    let results = plan(&[&file], config(), point(0.0, -0.001), point(0.041, 0.04))?;
    let collection = results[0].to_geojson()?;
    // two rides and the walk between them
    assert_eq!(collection.features.len(), 3);
    Ok(())
}
