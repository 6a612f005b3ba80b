use std::path::Path;

use geo::coord;
use hashbrown::HashMap;
use log::{debug, info};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use super::index::{StopsQuery, TransportIndex};
use super::raw_types::{IndexDocument, RouteRecord, StopRecord};
use crate::model::{TransportRoute, TransportStop, TransportStopExit, Way};
use crate::{Error, RouteId, TRANSPORT_STOP_ZOOM};

type StopEntry = GeomWithData<[i32; 2], usize>;

/// Map data file held in memory, with stops indexed by an R-tree over
/// their zoom-24 tile coordinates.
#[derive(Debug)]
pub struct MemoryTransportIndex {
    name: String,
    stops: Vec<TransportStop>,
    stops_tree: RTree<StopEntry>,
    routes: HashMap<u32, TransportRoute>,
    incomplete_routes: HashMap<RouteId, Vec<u32>>,
}

fn stop_tile(stop: &TransportStop) -> [i32; 2] {
    let shift = 31 - u32::from(TRANSPORT_STOP_ZOOM);
    [stop.x31 >> shift, stop.y31 >> shift]
}

impl MemoryTransportIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stops: Vec::new(),
            stops_tree: RTree::new(),
            routes: HashMap::new(),
            incomplete_routes: HashMap::new(),
        }
    }

    /// Builds a file from complete routes, storing route `i` at offset `i + 1`
    /// and deriving the stop records from the routes' stop sequences.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_routes(name: impl Into<String>, routes: Vec<TransportRoute>) -> Self {
        let mut index = Self::new(name);
        let mut stops: Vec<TransportStop> = Vec::new();
        let mut by_id: HashMap<i64, usize> = HashMap::new();
        for (i, route) in routes.into_iter().enumerate() {
            let offset = i as u32 + 1;
            for stop in route.forward_stops.iter().filter(|s| !s.is_missing_stop()) {
                let idx = *by_id.entry(stop.id).or_insert_with(|| {
                    let mut record = stop.clone();
                    record.references_to_routes.clear();
                    record.routes_ids.clear();
                    record.routes.clear();
                    stops.push(record);
                    stops.len() - 1
                });
                let record = &mut stops[idx];
                if !record.routes_ids.contains(&route.id) {
                    record.references_to_routes.push(offset as i32);
                    record.routes_ids.push(route.id);
                }
            }
            index.add_route(offset, route);
        }
        for stop in stops {
            index.add_stop(stop);
        }
        index
    }

    pub fn add_stop(&mut self, stop: TransportStop) {
        self.stops_tree
            .insert(GeomWithData::new(stop_tile(&stop), self.stops.len()));
        self.stops.push(stop);
    }

    pub fn add_route(&mut self, offset: u32, route: TransportRoute) {
        self.routes.insert(offset, route);
    }

    /// Registers the fragment at `offset` as a part of `base_route_id`.
    pub fn add_incomplete_fragment(&mut self, base_route_id: RouteId, offset: u32) {
        let offsets = self.incomplete_routes.entry(base_route_id).or_default();
        if !offsets.contains(&offset) {
            offsets.push(offset);
        }
    }

    pub fn stops_len(&self) -> usize {
        self.stops.len()
    }

    pub fn routes_len(&self) -> usize {
        self.routes.len()
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let document: IndexDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Failed to open file '{}': {}", path.display(), e),
            )
        })?;
        let document: IndexDocument = serde_json::from_reader(std::io::BufReader::new(file))?;
        let index = Self::from_document(document);
        info!(
            "Loaded map data '{}': {} stops, {} routes",
            index.name,
            index.stops.len(),
            index.routes.len()
        );
        Ok(index)
    }

    pub fn from_document(document: IndexDocument) -> Self {
        let mut index = Self::new(document.name);
        for record in document.stops {
            index.add_stop(stop_from_record(record));
        }
        for record in document.routes {
            let offset = record.offset;
            index.add_route(offset, route_from_record(record));
        }
        for record in document.incomplete_routes {
            for offset in record.offsets {
                index.add_incomplete_fragment(record.route_id, offset);
            }
        }
        index
    }
}

fn stop_from_record(record: StopRecord) -> TransportStop {
    let mut stop = if record.deleted {
        TransportStop::deleted(record.id, record.lat, record.lon)
    } else {
        let mut stop = TransportStop::new(record.id, record.lat, record.lon);
        stop.references_to_routes = record.references_to_routes;
        stop.routes_ids = record.routes_ids;
        stop
    };
    stop.name = record.name;
    stop.en_name = record.en_name;
    stop.deleted_routes_ids = record.deleted_routes_ids;
    stop.exits = record
        .exits
        .into_iter()
        .map(|exit| TransportStopExit::new(exit.reference, exit.lat, exit.lon))
        .collect();
    stop
}

fn route_from_record(record: RouteRecord) -> TransportRoute {
    let mut route = TransportRoute::new(record.id, record.route_type);
    route.reference = record.reference;
    route.name = record.name;
    route.operator = record.operator;
    route.color = record.color;
    route.dist = record.dist;
    route.incomplete = record.incomplete;
    route.schedule = record.schedule;
    route.forward_stops = record
        .stops
        .into_iter()
        .map(|s| {
            if s.missing {
                TransportStop::missing_stop(s.lat, s.lon)
            } else {
                TransportStop::new(s.id, s.lat, s.lon).with_name(s.name)
            }
        })
        .collect();
    route.forward_ways = record
        .ways
        .into_iter()
        .map(|w| {
            let nodes = w
                .nodes
                .into_iter()
                .map(|[lat, lon]| coord! { x: lon, y: lat })
                .collect();
            Way::with_nodes(w.id, nodes)
        })
        .collect();
    route
}

impl TransportIndex for MemoryTransportIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_transport_stops(&self, query: &StopsQuery) -> Result<Vec<TransportStop>, Error> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let envelope = AABB::from_corners(
            [query.left, query.top],
            [query.right - 1, query.bottom - 1],
        );
        let mut found: Vec<usize> = self
            .stops_tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        // tree order is unspecified; keep the file order
        found.sort_unstable();
        debug!(
            "{}: {} stops in [{}, {}) x [{}, {})",
            self.name,
            found.len(),
            query.left,
            query.right,
            query.top,
            query.bottom
        );
        Ok(found.into_iter().map(|i| self.stops[i].clone()).collect())
    }

    fn load_transport_routes(
        &self,
        offsets: &[u32],
    ) -> Result<HashMap<u32, TransportRoute>, Error> {
        Ok(offsets
            .iter()
            .filter_map(|offset| self.routes.get(offset).map(|r| (*offset, r.clone())))
            .collect())
    }

    fn incomplete_route_fragments(&self, base_route_id: RouteId) -> Vec<u32> {
        self.incomplete_routes
            .get(&base_route_id)
            .cloned()
            .unwrap_or_default()
    }
}
