use std::sync::Arc;

use crate::model::{TransportRoute, TransportStop};
use crate::{Error, RouteId, ScheduleTime};

const SEG_START_BITS: u32 = 10;
const DEPARTURE_BITS: u32 = 14;
const ROUTE_ID_BITS: u32 = 64 - SEG_START_BITS - DEPARTURE_BITS - 1;

/// Identity of a search segment: riding `route_id` on the trip leaving at
/// `departure_time` (`-1` when unscheduled), boarded at stop `seg_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub route_id: RouteId,
    pub departure_time: ScheduleTime,
    pub seg_start: usize,
}

impl SegmentKey {
    pub fn new(route_id: RouteId, departure_time: ScheduleTime, seg_start: usize) -> Self {
        Self {
            route_id,
            departure_time,
            seg_start,
        }
    }

    /// Packs the key as `route_id | departure_time + 1 (14 bits) | seg_start (10 bits)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentIdOverflow`] when a field does not fit its bits.
    #[allow(clippy::cast_sign_loss)]
    pub fn pack(&self) -> Result<u64, Error> {
        let departure = i64::from(self.departure_time) + 1;
        if !(0..1 << ROUTE_ID_BITS).contains(&self.route_id)
            || !(0..1 << DEPARTURE_BITS).contains(&departure)
            || self.seg_start >= 1 << SEG_START_BITS
        {
            return Err(Error::SegmentIdOverflow {
                route_id: self.route_id,
                departure_time: self.departure_time,
                seg_start: self.seg_start,
            });
        }
        let route_part = (self.route_id as u64) << (DEPARTURE_BITS + SEG_START_BITS);
        let departure_part = (departure as u64) << SEG_START_BITS;
        Ok(route_part | departure_part | self.seg_start as u64)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn unpack(key: u64) -> Self {
        let seg_start = (key & ((1 << SEG_START_BITS) - 1)) as usize;
        let departure = ((key >> SEG_START_BITS) & ((1 << DEPARTURE_BITS) - 1)) as ScheduleTime;
        let route_id = (key >> (DEPARTURE_BITS + SEG_START_BITS)) as RouteId;
        Self {
            route_id,
            departure_time: departure - 1,
            seg_start,
        }
    }
}

/// Boarding opportunity: a route (and scheduled trip) boarded at one of its stops.
#[derive(Debug, Clone)]
pub struct TransportRouteSegment {
    pub route: Arc<TransportRoute>,
    pub seg_start: usize,
    /// Departure from `seg_start` in schedule ticks, `-1` when unscheduled
    pub departure_time: ScheduleTime,
    key: u64,
}

impl TransportRouteSegment {
    /// # Errors
    ///
    /// Returns [`Error::SegmentIdOverflow`] when the identity cannot be packed.
    pub fn new(
        route: Arc<TransportRoute>,
        seg_start: usize,
        departure_time: ScheduleTime,
    ) -> Result<Self, Error> {
        let key = SegmentKey::new(route.id, departure_time, seg_start).pack()?;
        Ok(Self {
            route,
            seg_start,
            departure_time,
            key,
        })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn is_scheduled(&self) -> bool {
        self.departure_time >= 0
    }

    pub fn stop(&self, index: usize) -> Option<&TransportStop> {
        self.route.stop(index)
    }

    pub fn boarding_stop(&self) -> Option<&TransportStop> {
        self.route.stop(self.seg_start)
    }

    pub fn len(&self) -> usize {
        self.route.stops_len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.stops_len() == 0
    }

    /// Departure of the trip from its first stop, `-1` when unscheduled.
    pub fn trip_start(&self) -> ScheduleTime {
        if !self.is_scheduled() {
            return -1;
        }
        let offset = self
            .route
            .schedule
            .as_ref()
            .map_or(0, |schedule| schedule.offset_to_stop(self.seg_start));
        self.departure_time - offset
    }

    /// Departure of the same trip from `stop_index`, `-1` when unscheduled.
    pub fn departure_at(&self, stop_index: usize) -> ScheduleTime {
        if !self.is_scheduled() {
            return -1;
        }
        let offset = self
            .route
            .schedule
            .as_ref()
            .map_or(0, |schedule| schedule.offset_to_stop(stop_index));
        self.trip_start() + offset
    }

    /// Identity of riding on to `stop_index` on the same trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentIdOverflow`] when the identity cannot be packed.
    pub fn key_at(&self, stop_index: usize) -> Result<u64, Error> {
        SegmentKey::new(self.route.id, self.departure_at(stop_index), stop_index).pack()
    }

    /// Same route and the same trip.
    pub fn same_trip(&self, other: &TransportRouteSegment) -> bool {
        self.route.id == other.route.id && self.trip_start() == other.trip_start()
    }
}
