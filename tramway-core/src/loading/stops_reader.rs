use std::sync::Arc;

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, error, trace};

use super::combine::combine_route;
use super::index::{StopsQuery, TransportIndex};
use crate::model::{TransportRoute, TransportStop};
use crate::{Error, RouteId, StopId};

/// Routes hydrated during one planning session.
///
/// Per file, an offset maps to `None` once requested and to the route once
/// loaded, so no route is read twice from the same file. Combined versions of
/// incomplete routes are kept by route id.
#[derive(Debug, Default)]
pub struct RoutesCache {
    files: Vec<HashMap<u32, Option<Arc<TransportRoute>>>>,
    combined: HashMap<RouteId, Arc<TransportRoute>>,
}

impl RoutesCache {
    pub fn loaded_routes(&self) -> usize {
        self.files
            .iter()
            .map(|file| file.values().filter(|r| r.is_some()).count())
            .sum()
    }

    pub fn combined_routes(&self) -> usize {
        self.combined.len()
    }

    fn file_mut(&mut self, file: usize) -> &mut HashMap<u32, Option<Arc<TransportRoute>>> {
        if self.files.len() <= file {
            self.files.resize_with(file + 1, HashMap::new);
        }
        &mut self.files[file]
    }

    fn get(&self, file: usize, offset: u32) -> Option<&Option<Arc<TransportRoute>>> {
        self.files.get(file).and_then(|f| f.get(&offset))
    }
}

/// Stops collected for one query, first sighting of each id being canonical.
#[derive(Default)]
struct MergedStops {
    stops: Vec<TransportStop>,
    by_id: HashMap<StopId, usize>,
}

/// A sighting of a stop whose route references still have to be attached.
struct PendingStop {
    canonical: usize,
    file: usize,
    references: Vec<i32>,
}

/// Reads stops from several map data files, returning each physical stop once
/// with every route serving it resolved.
///
/// Files are consulted in the given order; earlier files take precedence, so a
/// stop deleted by an earlier file stays deleted and routes marked deleted on
/// the canonical record are not attached from later files.
pub struct TransportRouteStopsReader<'a> {
    files: Vec<&'a dyn TransportIndex>,
    cache: RoutesCache,
}

impl<'a> TransportRouteStopsReader<'a> {
    pub fn new(files: &[&'a dyn TransportIndex]) -> Self {
        Self::with_cache(files, RoutesCache::default())
    }

    pub fn with_cache(files: &[&'a dyn TransportIndex], cache: RoutesCache) -> Self {
        Self {
            files: files.to_vec(),
            cache,
        }
    }

    pub fn into_cache(self) -> RoutesCache {
        self.cache
    }

    pub fn cache(&self) -> &RoutesCache {
        &self.cache
    }

    pub fn files_len(&self) -> usize {
        self.files.len()
    }

    /// Merged stops inside `query` across all files.
    ///
    /// Deleted stops and stops left without routes are not returned. Stops
    /// come out in the order they were first seen.
    ///
    /// # Errors
    ///
    /// Returns an error if a file fails to answer a query or to load routes.
    pub fn read_merged_transport_stops(
        &mut self,
        query: &StopsQuery,
    ) -> Result<Vec<TransportStop>, Error> {
        let mut merged = MergedStops::default();
        for file in 0..self.files.len() {
            let stops = self.files[file].search_transport_stops(query)?;
            let pending = self.merge_transport_stops(file, &mut merged, stops);
            self.load_requested_routes(file)?;
            self.attach_routes(&mut merged, pending)?;
        }
        Ok(merged
            .stops
            .into_iter()
            .filter(|stop| !stop.is_deleted() && !stop.routes.is_empty())
            .collect())
    }

    fn merge_transport_stops(
        &mut self,
        file: usize,
        merged: &mut MergedStops,
        stops: Vec<TransportStop>,
    ) -> Vec<PendingStop> {
        let mut pending = Vec::new();
        for mut stop in stops {
            if stop.is_missing_stop() {
                continue;
            }
            match merged.by_id.get(&stop.id).copied() {
                None => {
                    let references = if stop.is_deleted() {
                        Vec::new()
                    } else {
                        std::mem::take(&mut stop.references_to_routes)
                    };
                    self.request_routes(file, &references);
                    stop.routes_ids.clear();
                    let canonical = merged.stops.len();
                    merged.by_id.insert(stop.id, canonical);
                    merged.stops.push(stop);
                    if !references.is_empty() {
                        pending.push(PendingStop {
                            canonical,
                            file,
                            references,
                        });
                    }
                }
                Some(canonical) if merged.stops[canonical].is_deleted() => {
                    trace!("Stop {} is deleted by an earlier file", stop.id);
                }
                Some(canonical) => {
                    let target = &mut merged.stops[canonical];
                    for route_id in &stop.deleted_routes_ids {
                        target.add_deleted_route_id(*route_id);
                    }
                    let references: Vec<i32> = if stop.routes_ids.is_empty() {
                        if !stop.has_references_to_routes() {
                            continue;
                        }
                        std::mem::take(&mut stop.references_to_routes)
                    } else {
                        stop.routes_ids
                            .iter()
                            .zip(&stop.references_to_routes)
                            .filter(|(route_id, _)| {
                                !target.has_route(**route_id) && !target.is_route_deleted(**route_id)
                            })
                            .map(|(_, reference)| *reference)
                            .collect()
                    };
                    if references.is_empty() {
                        continue;
                    }
                    self.request_routes(file, &references);
                    pending.push(PendingStop {
                        canonical,
                        file,
                        references,
                    });
                }
            }
        }
        pending
    }

    fn request_routes(&mut self, file: usize, references: &[i32]) {
        let requested = self.cache.file_mut(file);
        for offset in references.iter().filter_map(|r| u32::try_from(*r).ok()) {
            requested.entry(offset).or_insert(None);
        }
    }

    fn load_requested_routes(&mut self, file: usize) -> Result<(), Error> {
        let requested = self.cache.file_mut(file);
        let offsets: Vec<u32> = requested
            .iter()
            .filter(|(_, route)| route.is_none())
            .map(|(offset, _)| *offset)
            .sorted_unstable()
            .collect();
        if offsets.is_empty() {
            return Ok(());
        }
        let loaded = self.files[file].load_transport_routes(&offsets)?;
        debug!(
            "{}: loaded {} of {} requested routes",
            self.files[file].name(),
            loaded.len(),
            offsets.len()
        );
        let requested = self.cache.file_mut(file);
        for (offset, route) in loaded {
            requested.insert(offset, Some(Arc::new(route)));
        }
        Ok(())
    }

    fn attach_routes(
        &mut self,
        merged: &mut MergedStops,
        pending: Vec<PendingStop>,
    ) -> Result<(), Error> {
        for sighting in pending {
            for reference in &sighting.references {
                let Ok(offset) = u32::try_from(*reference) else {
                    continue;
                };
                let route = match self.cache.get(sighting.file, offset) {
                    Some(Some(route)) => Arc::clone(route),
                    Some(None) => {
                        error!(
                            "{}: route at offset {offset} was requested but not loaded",
                            self.files[sighting.file].name()
                        );
                        continue;
                    }
                    None => continue,
                };
                let route = self.get_combined_route(route)?;
                let stop = &mut merged.stops[sighting.canonical];
                if !stop.has_route(route.id) && !stop.is_route_deleted(route.id) {
                    stop.add_route_id(route.id);
                    stop.add_route(route);
                }
            }
            merged.stops[sighting.canonical].clear_references_to_routes();
        }
        Ok(())
    }

    /// Complete version of `route`: incomplete routes are stitched from their
    /// fragments in all files, once per session.
    ///
    /// # Errors
    ///
    /// Returns an error if a file fails to load fragments.
    pub fn get_combined_route(
        &mut self,
        route: Arc<TransportRoute>,
    ) -> Result<Arc<TransportRoute>, Error> {
        if !route.is_incomplete() {
            return Ok(route);
        }
        if let Some(combined) = self.cache.combined.get(&route.id) {
            return Ok(Arc::clone(combined));
        }
        let parts = self.find_incomplete_route_parts(&route)?;
        let combined = if parts.is_empty() {
            route
        } else {
            Arc::new(combine_route(&route, &parts))
        };
        self.cache.combined.insert(combined.id, Arc::clone(&combined));
        Ok(combined)
    }

    fn find_incomplete_route_parts(
        &mut self,
        base: &TransportRoute,
    ) -> Result<Vec<Arc<TransportRoute>>, Error> {
        let mut parts = Vec::new();
        for file in 0..self.files.len() {
            let offsets = self.files[file].incomplete_route_fragments(base.id);
            if offsets.is_empty() {
                continue;
            }
            let missing: Vec<u32> = offsets
                .iter()
                .copied()
                .filter(|offset| !matches!(self.cache.get(file, *offset), Some(Some(_))))
                .sorted_unstable()
                .dedup()
                .collect();
            if !missing.is_empty() {
                let loaded = self.files[file].load_transport_routes(&missing)?;
                let cached = self.cache.file_mut(file);
                for (offset, route) in loaded {
                    cached.insert(offset, Some(Arc::new(route)));
                }
            }
            parts.extend(offsets.iter().filter_map(|offset| match self.cache.get(file, *offset) {
                Some(Some(route)) => Some(Arc::clone(route)),
                _ => None,
            }));
        }
        trace!("Route {}: {} fragments found", base.id, parts.len());
        Ok(parts)
    }
}
