use hashbrown::HashMap;

use crate::model::{TransportRoute, TransportStop};
use crate::{Error, RouteId, TRANSPORT_STOP_ZOOM};

/// Stop lookup box in tile coordinates of [`TRANSPORT_STOP_ZOOM`].
///
/// Bounds are half-open: `left <= x < right`, `top <= y < bottom`, so a stop
/// lying on a tile border belongs to exactly one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopsQuery {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl StopsQuery {
    /// Query covering the 31-bit box `[left31, right31) x [top31, bottom31)`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_31(left31: i64, right31: i64, top31: i64, bottom31: i64) -> Self {
        let shift = 31 - u32::from(TRANSPORT_STOP_ZOOM);
        Self {
            left: (left31 >> shift) as i32,
            right: (right31 >> shift) as i32,
            top: (top31 >> shift) as i32,
            bottom: (bottom31 >> shift) as i32,
        }
    }

    /// Query covering tile `(x, y)` of `zoom`; `zoom` must not exceed [`TRANSPORT_STOP_ZOOM`].
    pub fn from_tile(zoom: u8, x: i32, y: i32) -> Self {
        let pz = 31 - u32::from(zoom);
        let (x, y) = (i64::from(x), i64::from(y));
        Self::from_31(x << pz, (x + 1) << pz, y << pz, (y + 1) << pz)
    }

    pub fn contains_31(&self, x31: i32, y31: i32) -> bool {
        let shift = 31 - u32::from(TRANSPORT_STOP_ZOOM);
        let (x, y) = (x31 >> shift, y31 >> shift);
        (self.left..self.right).contains(&x) && (self.top..self.bottom).contains(&y)
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }
}

/// One map data file holding transport stops and routes.
///
/// Stops reference routes through file-local offsets; routes are hydrated in
/// batches by offset. Routes split between files are linked through
/// incomplete-route fragments keyed by the base route id.
pub trait TransportIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Raw stop records inside `query`, carrying their route offsets.
    fn search_transport_stops(&self, query: &StopsQuery) -> Result<Vec<TransportStop>, Error>;

    /// Routes stored at `offsets` (sorted, without duplicates).
    fn load_transport_routes(&self, offsets: &[u32])
    -> Result<HashMap<u32, TransportRoute>, Error>;

    /// Offsets of the fragments of `base_route_id` stored in this file.
    fn incomplete_route_fragments(&self, base_route_id: RouteId) -> Vec<u32>;
}
